/// Handler modules for the hospital assistant MCP tools
pub mod assistant;
pub mod help;
pub mod hospitals;

#[cfg(test)]
mod test_handlers;

use rmcp::model::ErrorData;
use std::sync::Arc;

use crate::assistant::Assistant;
use crate::auth::{AccessPolicy, Principal};
use crate::directory::HospitalDirectory;
use crate::error::HospitalAssistantError;
use crate::repository_traits::HospitalRepository;
use crate::validation::InputValidator;

pub use help::HelpHandler;

/// Handler for MCP tool operations
pub struct ToolHandlers<R: HospitalRepository> {
    pub(crate) directory: Arc<HospitalDirectory<R>>,
    pub(crate) assistant: Arc<Assistant>,
    pub(crate) validator: Arc<InputValidator>,
    pub(crate) policy: AccessPolicy,
    pub(crate) principal: Principal,
    pub(crate) help: HelpHandler,
}

impl<R: HospitalRepository> ToolHandlers<R> {
    pub fn new(
        directory: Arc<HospitalDirectory<R>>,
        assistant: Arc<Assistant>,
        validator: Arc<InputValidator>,
        policy: AccessPolicy,
        principal: Principal,
    ) -> Self {
        Self {
            directory,
            assistant,
            validator,
            policy,
            principal,
            help: HelpHandler::new(),
        }
    }
}

/// Map a crate error onto the MCP error space
pub fn to_error_data(e: &HospitalAssistantError) -> ErrorData {
    match e {
        HospitalAssistantError::Validation { .. } | HospitalAssistantError::NotFound(_) => {
            ErrorData::invalid_params(e.to_string(), None)
        }
        HospitalAssistantError::Forbidden(_) => ErrorData::invalid_request(e.to_string(), None),
        _ => ErrorData::internal_error(e.to_string(), None),
    }
}
