use serde::{Deserialize, Serialize};

/// One answered question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub question: String,
    pub answer: String,
}

/// Append-only log of question and answer pairs in display order
#[derive(Debug, Default, Clone)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) -> &ConversationEntry {
        self.entries.push(ConversationEntry {
            question: question.into(),
            answer: answer.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order_and_duplicates() {
        let mut log = ConversationLog::new();
        assert!(log.is_empty());

        log.append("Where is AIIMS?", "Delhi");
        log.append("Where is AIIMS?", "Delhi");
        let last = log.append("Rating of Fortis?", "4").clone();

        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[0], log.entries()[1]);
        assert_eq!(log.entries()[2], last);
        assert_eq!(last.answer, "4");
    }
}
