use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, ErrorData, ServerCapabilities, ServerInfo},
};
use rmcp_macros::{tool, tool_handler, tool_router};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::assistant::{Assistant, HospitalSource};
use crate::auth::{AccessPolicy, Principal};
use crate::backend::{HttpModelProvider, ModelProvider};
use crate::config::{BackendKind, Config};
use crate::directory::HospitalDirectory;
use crate::error::HospitalAssistantError;
use crate::handlers::help::HelpParams;
use crate::handlers::{ToolHandlers, to_error_data};
use crate::lexical::LexicalModelProvider;
use crate::models::{
    CitySearchParams, HospitalCreateInput, HospitalDetailsParams, HospitalIdParams,
    HospitalListParams, HospitalUpdateParams, QaAskParams, SelectCityParams,
};
use crate::notify::{Notifier, TracingNotifier};
use crate::repository::InMemoryHospitalRepository;
use crate::retry::RetryPolicy;
use crate::transport::HttpTransport;
use crate::validation::InputValidator;

/// Main service struct for the hospital assistant MCP server
#[derive(Clone)]
pub struct HospitalAssistantService {
    tool_router: ToolRouter<Self>,
    handlers: Arc<ToolHandlers<InMemoryHospitalRepository>>,
    config: Arc<Config>,
}

/// Pick the inference backend named in the configuration
pub fn model_provider(config: &Config) -> crate::error::Result<Arc<dyn ModelProvider>> {
    match config.assistant.backend {
        BackendKind::Lexical => Ok(Arc::new(LexicalModelProvider)),
        BackendKind::Http => {
            let transport = HttpTransport::new(
                config.transport.endpoint.clone(),
                config.transport.api_key.clone(),
                config.transport_timeout(),
                RetryPolicy::from(&config.transport.retry),
            )?;
            Ok(Arc::new(HttpModelProvider::new(Arc::new(transport))))
        }
    }
}

impl HospitalAssistantService {
    /// Create a new service instance
    pub async fn new(config: Arc<Config>) -> crate::error::Result<Self> {
        Self::with_notifier(config, Arc::new(TracingNotifier)).await
    }

    pub async fn with_notifier(
        config: Arc<Config>,
        notifier: Arc<dyn Notifier>,
    ) -> crate::error::Result<Self> {
        tracing::info!("Service::new() - Starting initialization");

        let repository = Arc::new(if config.store.seed_sample_data {
            InMemoryHospitalRepository::with_sample_data(config.store_latency())
        } else {
            InMemoryHospitalRepository::empty(config.store_latency())
        });

        let directory = Arc::new(HospitalDirectory::new(repository, notifier.clone()));
        if let Err(e) = directory.refresh().await {
            tracing::warn!("Service::new() - Starting with an empty directory: {}", e);
        }
        tracing::info!(
            "Service::new() - Directory loaded with {} hospitals",
            directory.hospitals().len()
        );

        let provider = model_provider(&config)?;
        let source: Arc<dyn HospitalSource> = Arc::new(directory.subscribe());
        let assistant = Arc::new(Assistant::from_config(
            &config.assistant,
            provider,
            source,
            notifier,
        ));
        assistant.mount(config.load_delay());
        tracing::info!(
            "Service::new() - Model load scheduled in {} ms ({:?} backend)",
            config.assistant.load_delay_ms,
            config.assistant.backend
        );

        let principal = Principal::from_config(&config.auth);
        let handlers = Arc::new(ToolHandlers::new(
            directory,
            assistant,
            Arc::new(InputValidator::new()),
            AccessPolicy::new(config.auth.admin_domain.clone()),
            principal,
        ));

        tracing::info!("Service::new() - Service initialization complete");
        Ok(Self {
            tool_router: Self::tool_router(),
            handlers,
            config,
        })
    }
}

fn json_content<T: Serialize>(value: T) -> Result<CallToolResult, ErrorData> {
    let content = Content::json(value).map_err(|e| {
        ErrorData::internal_error(format!("Failed to create JSON content: {e}"), None)
    })?;
    Ok(CallToolResult::success(vec![content]))
}

fn respond<T: Serialize>(
    tool: &str,
    result: crate::error::Result<T>,
) -> Result<CallToolResult, ErrorData> {
    match result {
        Ok(value) => json_content(value),
        Err(e) => {
            match &e {
                HospitalAssistantError::Validation { .. }
                | HospitalAssistantError::NotFound(_)
                | HospitalAssistantError::Forbidden(_) => {
                    tracing::warn!("{} rejected: {}", tool, e)
                }
                _ => tracing::error!("{} error: {}", tool, e),
            }
            Err(to_error_data(&e))
        }
    }
}

#[tool_router]
impl HospitalAssistantService {
    #[tool(description = "List hospitals in the directory, optionally for one city")]
    pub async fn hospital_list(
        &self,
        params: Parameters<HospitalListParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("hospital_list", self.handlers.hospital_list(params.0).await)
    }

    #[tool(description = "View a single hospital by ID")]
    pub async fn hospital_get(
        &self,
        params: Parameters<HospitalIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("hospital_get", self.handlers.hospital_get(params.0).await)
    }

    #[tool(description = "Search known cities and list the available specialities")]
    pub async fn hospital_cities(
        &self,
        params: Parameters<CitySearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        json_content(self.handlers.hospital_cities(params.0))
    }

    #[tool(description = "Filter the directory by city; an empty city clears the filter")]
    pub async fn hospital_select_city(
        &self,
        params: Parameters<SelectCityParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(
            "hospital_select_city",
            self.handlers.hospital_select_city(params.0).await,
        )
    }

    #[tool(description = "Add a hospital to the directory (administrators only)")]
    pub async fn hospital_create(
        &self,
        params: Parameters<HospitalCreateInput>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("hospital_create", self.handlers.hospital_create(params.0).await)
    }

    #[tool(description = "Edit a hospital's fields (administrators only)")]
    pub async fn hospital_update(
        &self,
        params: Parameters<HospitalUpdateParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("hospital_update", self.handlers.hospital_update(params.0).await)
    }

    #[tool(
        description = "Attach description, images and staff counts to a hospital (administrators only)"
    )]
    pub async fn hospital_add_details(
        &self,
        params: Parameters<HospitalDetailsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(
            "hospital_add_details",
            self.handlers.hospital_add_details(params.0).await,
        )
    }

    #[tool(description = "Delete a hospital (administrators only)")]
    pub async fn hospital_delete(
        &self,
        params: Parameters<HospitalIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("hospital_delete", self.handlers.hospital_delete(params.0).await)
    }

    #[tool(description = "Ask the hospital assistant a free-text question")]
    pub async fn qa_ask(
        &self,
        params: Parameters<QaAskParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("qa_ask", self.handlers.qa_ask(params.0).await)
    }

    #[tool(description = "Report the question-answering model state and conversation size")]
    pub async fn qa_status(&self) -> Result<CallToolResult, ErrorData> {
        respond("qa_status", self.handlers.qa_status())
    }

    #[tool(description = "Reload the question-answering model")]
    pub async fn qa_retry_model(&self) -> Result<CallToolResult, ErrorData> {
        respond("qa_retry_model", self.handlers.qa_retry_model().await)
    }

    #[tool(description = "List the questions asked so far with their answers")]
    pub async fn qa_history(&self) -> Result<CallToolResult, ErrorData> {
        json_content(self.handlers.qa_history())
    }

    #[tool(description = "Get help information about available tools and their usage")]
    pub async fn help(
        &self,
        params: Parameters<HelpParams>,
    ) -> Result<CallToolResult, ErrorData> {
        json_content(self.handlers.help.help(params.0))
    }
}

#[tool_handler]
impl ServerHandler for HospitalAssistantService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: rmcp::model::Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(
                "Hospital directory with a question-answering assistant over its data".into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Arc<Config> {
        let mut config = Config::default();
        config.store.simulated_latency_ms = 0;
        config.assistant.load_delay_ms = 0;
        Arc::new(config)
    }

    #[tokio::test]
    async fn builds_with_lexical_backend() {
        let service = HospitalAssistantService::new(test_config()).await.unwrap();
        assert_eq!(service.handlers.directory.hospitals().len(), 5);

        let status = service.handlers.assistant.wait_for_auto_load().await;
        assert!(status.is_ready());

        let info = service.get_info();
        assert_eq!(info.server_info.name, "hospital-assistant");
    }

    #[tokio::test]
    async fn unseeded_store_starts_empty() {
        let mut config = (*test_config()).clone();
        config.store.seed_sample_data = false;
        let service = HospitalAssistantService::new(Arc::new(config)).await.unwrap();
        assert!(service.handlers.directory.hospitals().is_empty());
    }

    #[test]
    fn http_backend_builds_a_provider() {
        let mut config = Config::default();
        config.assistant.backend = BackendKind::Http;
        assert!(model_provider(&config).is_ok());
    }
}
