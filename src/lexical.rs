//! In-process extractive question answering over labelled context lines.
//!
//! The context is split into blocks of `Label: value` lines. A question is
//! matched to a block through the words of its name (or its location) and to
//! a line through label keywords. The answer is the value span of that line.

use async_trait::async_trait;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use std::sync::Arc;

use crate::assistant::context::{
    DEPARTMENTS_LABEL, DESCRIPTION_LABEL, DOCTORS_LABEL, LOCATION_LABEL, MISSING_COUNT,
    MISSING_DESCRIPTION, NAME_LABEL, RATING_LABEL, SPECIALITIES_LABEL,
};
use crate::backend::{ModelProvider, ModelSpec, QaModel, RawAnswer};
use crate::error::Result;

/// Words that do not identify a particular hospital
const GENERIC_NAME_WORDS: &[&str] = &["hospital", "hospitals", "healthcare", "the", "of", "and"];

/// Score of an answer whose value is a placeholder
const PLACEHOLDER_SCORE: f64 = 0.05;

/// Minimum question-token length for a fuzzy keyword hit
const MIN_FUZZY_LEN: usize = 4;

const LABEL_KEYWORDS: &[(&str, &[&str])] = &[
    (RATING_LABEL, &["rating", "rated", "rate", "stars", "score"]),
    (
        LOCATION_LABEL,
        &["where", "location", "located", "city", "situated"],
    ),
    (
        SPECIALITIES_LABEL,
        &[
            "speciality",
            "specialities",
            "specialty",
            "specialties",
            "specialize",
            "specialise",
            "treat",
        ],
    ),
    (DOCTORS_LABEL, &["doctors", "doctor", "physicians", "staff"]),
    (DEPARTMENTS_LABEL, &["departments", "department"]),
    (DESCRIPTION_LABEL, &["describe", "description", "about", "tell"]),
    (NAME_LABEL, &["which", "name", "called"]),
];

#[derive(Debug)]
struct Block<'a> {
    lines: Vec<(&'a str, &'a str)>,
}

impl<'a> Block<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        let lines: Vec<_> = text
            .lines()
            .filter_map(|line| line.split_once(": "))
            .map(|(label, value)| (label.trim(), value.trim()))
            .collect();
        if lines.is_empty() { None } else { Some(Self { lines }) }
    }

    fn value(&self, label: &str) -> Option<&'a str> {
        self.lines
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(label))
            .map(|(_, v)| *v)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub struct LexicalQaModel {
    matcher: SkimMatcherV2,
}

impl Default for LexicalQaModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalQaModel {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default(),
        }
    }

    /// How strongly the question points at this block, in [0, 1]
    fn entity_score(&self, block: &Block<'_>, question: &[String]) -> f64 {
        let name_tokens: Vec<String> = block
            .value(NAME_LABEL)
            .map(tokenize)
            .unwrap_or_default();
        let distinctive: Vec<&String> = name_tokens
            .iter()
            .filter(|t| !GENERIC_NAME_WORDS.contains(&t.as_str()))
            .collect();
        let wanted: Vec<&String> = if distinctive.is_empty() {
            name_tokens.iter().collect()
        } else {
            distinctive
        };

        if !wanted.is_empty() {
            let hits = wanted.iter().filter(|t| question.contains(t)).count();
            if hits > 0 {
                return hits as f64 / wanted.len() as f64;
            }
        }

        // A block can also be singled out by its city
        let location = block.value(LOCATION_LABEL).map(tokenize).unwrap_or_default();
        if !location.is_empty() && location.iter().all(|t| question.contains(t)) {
            return 0.5;
        }
        0.0
    }

    fn keyword_hit(&self, token: &str, keyword: &str) -> f64 {
        if token == keyword || token.starts_with(keyword) {
            return 1.0;
        }
        // Tolerate dropped letters ("ratng", "doctrs")
        if token.len() >= MIN_FUZZY_LEN
            && token.len() < keyword.len()
            && self.matcher.fuzzy_match(keyword, token).is_some()
        {
            return 0.6;
        }
        0.0
    }

    /// Best matching label for the question and its strength
    fn label_score(&self, question: &[String]) -> Option<(&'static str, f64)> {
        let mut best: Option<(&'static str, f64)> = None;
        for (label, keywords) in LABEL_KEYWORDS {
            let strength = question
                .iter()
                .flat_map(|token| keywords.iter().map(move |k| (token, k)))
                .map(|(token, keyword)| self.keyword_hit(token, keyword))
                .fold(0.0, f64::max);
            if strength > best.map_or(0.0, |(_, s)| s) {
                best = Some((*label, strength));
            }
        }
        best
    }

    fn extract(&self, question: &str, context: &str) -> RawAnswer {
        let blocks: Vec<Block<'_>> = context.split("\n\n").filter_map(Block::parse).collect();
        let tokens = tokenize(question);

        let mut chosen: Option<(&Block<'_>, f64)> = None;
        for block in &blocks {
            let score = self.entity_score(block, &tokens);
            if chosen.is_none_or(|(_, best)| score > best) {
                chosen = Some((block, score));
            }
        }
        let Some((block, entity)) = chosen else {
            return RawAnswer {
                answer: String::new(),
                score: 0.0,
            };
        };

        let (label, label_strength) = self
            .label_score(&tokens)
            .unwrap_or((DESCRIPTION_LABEL, 0.0));
        let answer = block.value(label).unwrap_or_default().to_string();

        let score = if answer.is_empty() || answer == MISSING_COUNT || answer == MISSING_DESCRIPTION
        {
            PLACEHOLDER_SCORE.min(entity)
        } else {
            (0.5 * entity + 0.5 * label_strength).clamp(0.0, 1.0)
        };

        tracing::debug!(
            "Lexical answer '{}' for label {} (entity {:.2}, label {:.2})",
            answer,
            label,
            entity,
            label_strength
        );
        RawAnswer { answer, score }
    }
}

#[async_trait]
impl QaModel for LexicalQaModel {
    async fn answer(&self, question: &str, context: &str) -> Result<RawAnswer> {
        Ok(self.extract(question, context))
    }
}

/// Provides the lexical model; acquisition never touches the network
#[derive(Debug, Default, Clone)]
pub struct LexicalModelProvider;

#[async_trait]
impl ModelProvider for LexicalModelProvider {
    async fn acquire(&self, spec: &ModelSpec) -> Result<Arc<dyn QaModel>> {
        spec.ensure_supported()?;
        tracing::info!(
            "Using lexical extractive QA in place of {} on {}",
            spec.model,
            spec.device
        );
        Ok(Arc::new(LexicalQaModel::new()))
    }
}
