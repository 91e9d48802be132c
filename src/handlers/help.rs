use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{AVAILABLE_CITIES, AVAILABLE_SPECIALITIES};

/// Parameters for the help tool
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct HelpParams {
    #[schemars(
        description = "Optional tool to get help for ('hospital_create', 'qa_ask', ...); leave empty for general help"
    )]
    #[serde(default)]
    pub tool: Option<String>,
}

/// Response structure for help requests
#[derive(Debug, Serialize)]
pub struct HelpResponse {
    pub overview: String,
    pub tools: serde_json::Value,
    pub examples: serde_json::Value,
    pub tips: Vec<String>,
}

/// Handler for help operations
#[derive(Debug, Default)]
pub struct HelpHandler;

impl HelpHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn help(&self, params: HelpParams) -> HelpResponse {
        tracing::info!("Processing help request for {:?}", params.tool);
        match params.tool.as_deref() {
            Some("hospital_create") | Some("hospital_update") | Some("hospital_add_details") => {
                self.editing_help()
            }
            Some("qa_ask") | Some("qa_status") | Some("qa_retry_model") | Some("qa_history") => {
                self.assistant_help()
            }
            _ => self.general_help(),
        }
    }

    fn general_help(&self) -> HelpResponse {
        HelpResponse {
            overview: "Hospital Assistant MCP Server - a hospital directory with a question-answering assistant that reads the directory.\n\nDirectory tools list, filter and view hospitals; administrators can add, edit and delete them. The assistant answers free-text questions from the current hospital list.".to_string(),

            tools: json!({
                "hospital_list": "List hospitals, optionally for one city",
                "hospital_get": "View one hospital by ID",
                "hospital_cities": "Search the known cities and list specialities",
                "hospital_select_city": "Set the directory's city filter (empty clears it)",
                "hospital_create": "Add a hospital (admin only)",
                "hospital_update": "Edit a hospital (admin only)",
                "hospital_add_details": "Attach description, images and staff counts (admin only)",
                "hospital_delete": "Delete a hospital (admin only)",
                "qa_ask": "Ask the assistant a question",
                "qa_status": "Model state and conversation size",
                "qa_retry_model": "Reload the question-answering model after a failure",
                "qa_history": "Questions and answers so far",
                "help": "This help"
            }),

            examples: json!({
                "filter_by_city": {
                    "tool": "hospital_list",
                    "params": { "city": "Delhi" }
                },
                "ask_rating": {
                    "tool": "qa_ask",
                    "params": { "question": "What is the rating of Apollo Hospital?" }
                }
            }),

            tips: vec![
                "City filtering is case-insensitive".to_string(),
                "The assistant only knows what is in the directory; low-confidence answers are replaced with a fallback".to_string(),
                "If qa_status reports a failed model, call qa_retry_model".to_string(),
            ],
        }
    }

    fn editing_help(&self) -> HelpResponse {
        HelpResponse {
            overview: "Editing tools require a signed-in administrator. Input is validated before it reaches the store.".to_string(),
            tools: json!({
                "hospital_create": {
                    "required_params": {
                        "name": "At least 3 characters",
                        "city": "City name",
                        "image_url": "http(s) URL",
                        "specialities": "At least one speciality",
                        "rating": "0 to 5"
                    }
                },
                "hospital_update": {
                    "required_params": { "id": "Hospital ID", "updates": "Any subset of hospital fields" }
                },
                "hospital_add_details": {
                    "required_params": {
                        "id": "Hospital ID",
                        "details": {
                            "description": "Free text",
                            "images": "List of http(s) URLs",
                            "number_of_doctors": "Non-negative integer",
                            "number_of_departments": "Non-negative integer"
                        }
                    }
                }
            }),
            examples: json!({
                "create": {
                    "name": "Ruby Hall Clinic",
                    "city": "Pune",
                    "image_url": "https://example.com/ruby.jpg",
                    "specialities": ["Cardiology", "Oncology"],
                    "rating": 4.4
                }
            }),
            tips: vec![
                format!("Known cities: {}", AVAILABLE_CITIES.join(", ")),
                format!("Known specialities: {}", AVAILABLE_SPECIALITIES.join(", ")),
            ],
        }
    }

    fn assistant_help(&self) -> HelpResponse {
        HelpResponse {
            overview: "The assistant loads its model once after start-up. Questions are rejected while the model is loading or failed, and while another question is being answered.".to_string(),
            tools: json!({
                "qa_ask": { "required_params": { "question": "Free-text question" } },
                "qa_status": { "states": ["unloaded", "loading", "ready", "failed"] },
                "qa_retry_model": "Reload the model from any state",
                "qa_history": "Entries in the order they were asked"
            }),
            examples: json!({
                "rating": "What is the rating of Apollo Hospital?",
                "location": "Where is Fortis Healthcare located?",
                "staff": "How many doctors work at AIIMS?"
            }),
            tips: vec![
                "Mention the hospital by name for the best answers".to_string(),
            ],
        }
    }
}
