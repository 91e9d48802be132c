use super::*;
use crate::assistant::{ConfidencePolicy, ModelStatus};
use crate::backend::ModelSpec;
use crate::handlers::help::HelpParams;
use crate::lexical::LexicalModelProvider;
use crate::models::{
    CitySearchParams, HospitalCreateInput, HospitalIdParams, HospitalListParams,
    HospitalUpdateParams, HospitalUpdateInput, QaAskParams, SelectCityParams,
};
use crate::notify::TracingNotifier;
use crate::repository::InMemoryHospitalRepository;
use std::time::Duration;

async fn handlers(principal: Principal) -> ToolHandlers<InMemoryHospitalRepository> {
    let notifier = Arc::new(TracingNotifier);
    let repository = Arc::new(InMemoryHospitalRepository::with_sample_data(Duration::ZERO));
    let directory = Arc::new(HospitalDirectory::new(repository, notifier.clone()));
    directory.refresh().await.unwrap();

    let assistant = Arc::new(Assistant::new(
        Arc::new(LexicalModelProvider),
        ModelSpec {
            task: "question-answering".into(),
            model: "lexical".into(),
            device: "cpu".into(),
        },
        Arc::new(directory.subscribe()),
        ConfidencePolicy::default(),
        notifier,
    ));

    ToolHandlers::new(
        directory,
        assistant,
        Arc::new(InputValidator::new()),
        AccessPolicy::new("hospital-admin.com"),
        principal,
    )
}

fn admin() -> Principal {
    Principal::signed_in("admin-1", "ops@hospital-admin.com")
}

fn new_hospital() -> HospitalCreateInput {
    HospitalCreateInput {
        name: "Ruby Hall Clinic".into(),
        city: "Pune".into(),
        image_url: "https://example.com/ruby.jpg".into(),
        specialities: vec!["Cardiology".into()],
        rating: 4.4,
    }
}

#[tokio::test]
async fn non_admin_cannot_create() {
    let handlers = handlers(Principal::signed_in("u1", "visitor@gmail.com")).await;
    let err = handlers.hospital_create(new_hospital()).await.unwrap_err();
    assert!(matches!(err, HospitalAssistantError::Forbidden(_)));
    assert_eq!(handlers.directory.hospitals().len(), 5);

    let data = to_error_data(&err);
    assert_eq!(data.code, rmcp::model::ErrorCode::INVALID_REQUEST);
}

#[tokio::test]
async fn admin_create_is_validated_then_stored() {
    let handlers = handlers(admin()).await;

    let mut bad = new_hospital();
    bad.rating = 7.0;
    let err = handlers.hospital_create(bad).await.unwrap_err();
    assert!(matches!(err, HospitalAssistantError::Validation { .. }));
    assert_eq!(
        to_error_data(&err).code,
        rmcp::model::ErrorCode::INVALID_PARAMS
    );

    let created = handlers.hospital_create(new_hospital()).await.unwrap();
    assert_eq!(created["name"], "Ruby Hall Clinic");
    assert_eq!(handlers.directory.hospitals().len(), 6);
}

#[tokio::test]
async fn list_filters_and_selects_city() {
    let handlers = handlers(Principal::anonymous()).await;

    let delhi = handlers
        .hospital_list(HospitalListParams {
            city: Some("delhi".into()),
        })
        .await
        .unwrap();
    assert_eq!(delhi["count"], 2);

    let view = handlers
        .hospital_select_city(SelectCityParams {
            city: "Bangalore".into(),
        })
        .await
        .unwrap();
    assert_eq!(view["selected_city"], "Bangalore");
    assert_eq!(view["hospitals"].as_array().unwrap().len(), 2);
    assert_eq!(view["total"], 5);

    let cities = handlers.hospital_cities(CitySearchParams { term: "pun".into() });
    assert_eq!(cities["cities"], serde_json::json!(["Pune"]));
}

#[tokio::test]
async fn update_and_delete_flow() {
    let handlers = handlers(admin()).await;

    let updated = handlers
        .hospital_update(HospitalUpdateParams {
            id: "3".into(),
            updates: HospitalUpdateInput {
                rating: Some(4.1),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    assert_eq!(updated["rating"], 4.1);

    let deleted = handlers
        .hospital_delete(HospitalIdParams { id: "3".into() })
        .await
        .unwrap();
    assert_eq!(deleted["deleted"], true);

    let err = handlers
        .hospital_get(HospitalIdParams { id: "3".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, HospitalAssistantError::NotFound(_)));
}

#[tokio::test]
async fn assistant_sees_directory_changes() {
    let handlers = handlers(admin()).await;

    let rejected = handlers
        .qa_ask(QaAskParams {
            question: "Where is Ruby Hall Clinic?".into(),
        })
        .await
        .unwrap();
    assert_eq!(rejected["outcome"], "rejected");
    assert_eq!(rejected["reason"], "model_not_ready");

    assert_eq!(handlers.assistant.retry_model().await, ModelStatus::Ready);
    handlers.hospital_create(new_hospital()).await.unwrap();

    let answered = handlers
        .qa_ask(QaAskParams {
            question: "Where is Ruby Hall Clinic?".into(),
        })
        .await
        .unwrap();
    assert_eq!(answered["outcome"], "answered");
    assert_eq!(answered["entry"]["answer"], "Pune");
    assert_eq!(handlers.qa_history()["count"], 1);
    assert_eq!(handlers.qa_status().unwrap()["model"]["state"], "ready");
}

#[test]
fn help_covers_every_tool() {
    let help = HelpHandler::new().help(HelpParams::default());
    for tool in [
        "hospital_list",
        "hospital_create",
        "qa_ask",
        "qa_retry_model",
        "help",
    ] {
        assert!(help.tools.get(tool).is_some(), "missing {tool}");
    }

    let qa = HelpHandler::new().help(HelpParams {
        tool: Some("qa_ask".into()),
    });
    assert!(qa.overview.contains("model"));
}
