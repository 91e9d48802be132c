use serde::Serialize;

use crate::config::AuthConfig;
use crate::error::{HospitalAssistantError, Result};

/// The user on whose behalf directory operations run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Principal {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            email: Some(email.into()),
            full_name: None,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            user_id: config.operator_id.clone(),
            email: config.operator_email.clone(),
            full_name: config.operator_name.clone(),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Boolean admin gate: signed-in users with an email in the admin domain
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    admin_domain: String,
}

impl AccessPolicy {
    pub fn new(admin_domain: impl Into<String>) -> Self {
        Self {
            admin_domain: admin_domain.into(),
        }
    }

    pub fn is_admin(&self, principal: &Principal) -> bool {
        if !principal.is_signed_in() {
            return false;
        }
        let suffix = format!("@{}", self.admin_domain.to_lowercase());
        principal
            .email
            .as_deref()
            .is_some_and(|email| email.to_lowercase().ends_with(&suffix))
    }

    pub fn require_admin(&self, principal: &Principal, action: &str) -> Result<()> {
        if self.is_admin(principal) {
            return Ok(());
        }
        tracing::warn!(
            user = principal.user_id.as_deref().unwrap_or("anonymous"),
            "Rejected {} without admin rights",
            action
        );
        Err(HospitalAssistantError::Forbidden(format!(
            "Only administrators can {action}"
        )))
    }
}
