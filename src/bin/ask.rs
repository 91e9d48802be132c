use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use hospital_assistant::assistant::{Assistant, ModelStatus, SubmitOutcome};
use hospital_assistant::config::Config;
use hospital_assistant::directory::HospitalDirectory;
use hospital_assistant::notify::{ChannelNotifier, NotificationLevel};
use hospital_assistant::repository::InMemoryHospitalRepository;
use hospital_assistant::service::model_provider;

#[tokio::main]
async fn main() -> Result<()> {
    // Minimal stderr tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    let notifier = Arc::new(ChannelNotifier::new(32));
    let mut notifications = notifier.subscribe();
    tokio::spawn(async move {
        while let Ok(note) = notifications.recv().await {
            let tag = match note.level {
                NotificationLevel::Success => "ok",
                NotificationLevel::Error => "!!",
            };
            eprintln!("[{tag}] {}", note.message);
        }
    });

    let repository = Arc::new(InMemoryHospitalRepository::with_sample_data(
        config.store_latency(),
    ));
    let directory = HospitalDirectory::new(repository, notifier.clone());
    directory.refresh().await?;

    let assistant = Assistant::from_config(
        &config.assistant,
        model_provider(&config)?,
        Arc::new(directory.subscribe()),
        notifier,
    );
    assistant.mount(config.load_delay());
    eprintln!("Loading the Q&A model... This may take a few moments.");
    if let ModelStatus::Failed { message } = assistant.wait_for_auto_load().await {
        eprintln!("{message} Type /retry to try again.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/retry" => {
                let status = assistant.retry_model().await;
                eprintln!("Model: {}", serde_json::to_string(&status)?);
            }
            "/history" => {
                for entry in assistant.history() {
                    println!("Q: {}\nA: {}\n", entry.question, entry.answer);
                }
            }
            question => match assistant.ask(question).await {
                SubmitOutcome::Answered { entry } | SubmitOutcome::Failed { entry, .. } => {
                    println!("Q: {}\nA: {}\n", entry.question, entry.answer);
                }
                SubmitOutcome::Rejected { reason } => {
                    eprintln!("Question not submitted: {}", serde_json::to_string(&reason)?);
                }
                SubmitOutcome::Discarded => {}
            },
        }
    }

    assistant.dispose();
    Ok(())
}
