use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::error::{HospitalAssistantError, Result};
use crate::models::{Hospital, HospitalCreateInput, HospitalDetailsInput, HospitalUpdateInput};
use crate::notify::Notifier;
use crate::repository_traits::HospitalRepository;

/// Shared snapshot of the full hospital list
pub type HospitalFeed = watch::Receiver<Arc<Vec<Hospital>>>;

#[derive(Debug, Default)]
struct DirectoryState {
    selected_city: String,
    filtered: Vec<Hospital>,
    loading: bool,
    error: Option<String>,
}

/// Serializable view of the directory for tool responses
#[derive(Debug, Clone, serde::Serialize)]
pub struct DirectoryView {
    pub selected_city: String,
    pub loading: bool,
    pub error: Option<String>,
    pub total: usize,
    pub hospitals: Vec<Hospital>,
}

/// Owns the current hospital list, the city filter and user feedback for
/// directory operations. Every change to the full list is published on a
/// watch channel so the assistant always reads the latest snapshot.
pub struct HospitalDirectory<R: HospitalRepository> {
    repository: Arc<R>,
    notifier: Arc<dyn Notifier>,
    hospitals: watch::Sender<Arc<Vec<Hospital>>>,
    state: Mutex<DirectoryState>,
}

impl<R: HospitalRepository> HospitalDirectory<R> {
    pub fn new(repository: Arc<R>, notifier: Arc<dyn Notifier>) -> Self {
        let (hospitals, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            repository,
            notifier,
            hospitals,
            state: Mutex::new(DirectoryState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DirectoryState> {
        // State is plain data; a poisoned lock still holds a usable value
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> HospitalFeed {
        self.hospitals.subscribe()
    }

    pub fn hospitals(&self) -> Arc<Vec<Hospital>> {
        self.hospitals.borrow().clone()
    }

    pub fn selected_city(&self) -> String {
        self.state().selected_city.clone()
    }

    pub fn filtered_hospitals(&self) -> Vec<Hospital> {
        self.state().filtered.clone()
    }

    pub fn view(&self) -> DirectoryView {
        let total = self.hospitals.borrow().len();
        let state = self.state();
        DirectoryView {
            selected_city: state.selected_city.clone(),
            loading: state.loading,
            error: state.error.clone(),
            total,
            hospitals: state.filtered.clone(),
        }
    }

    /// Reload the full list from the repository
    pub async fn refresh(&self) -> Result<()> {
        self.state().loading = true;
        let result = self.repository.get_all().await;
        match result {
            Ok(hospitals) => {
                tracing::info!("Loaded {} hospitals", hospitals.len());
                self.hospitals.send_replace(Arc::new(hospitals));
                {
                    let mut state = self.state();
                    state.error = None;
                    state.loading = false;
                }
                self.refilter().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load hospitals: {}", e);
                {
                    let mut state = self.state();
                    state.error = Some("Failed to load hospitals".to_string());
                    state.loading = false;
                }
                self.notifier.notify_error("Failed to load hospitals");
                Err(e)
            }
        }
    }

    /// Filter the directory by city; an empty city clears the filter
    pub async fn select_city(&self, city: &str) -> Result<Vec<Hospital>> {
        let city = city.trim().to_string();
        self.state().selected_city = city.clone();
        self.apply_filter(&city).await
    }

    async fn refilter(&self) {
        let city = self.selected_city();
        // Failures are already reported to the user
        let _ = self.apply_filter(&city).await;
    }

    async fn apply_filter(&self, city: &str) -> Result<Vec<Hospital>> {
        if city.is_empty() {
            let all = self.hospitals().as_ref().clone();
            self.state().filtered = all.clone();
            return Ok(all);
        }

        self.state().loading = true;
        let result = self.repository.get_by_city(city).await;
        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(filtered) => {
                // A newer selection wins over a late result
                if state.selected_city == city {
                    state.filtered = filtered.clone();
                }
                Ok(filtered)
            }
            Err(e) => {
                drop(state);
                tracing::error!("Failed to filter hospitals by {}: {}", city, e);
                self.notifier.notify_error("Failed to filter hospitals");
                Err(e)
            }
        }
    }

    pub async fn get_hospital(&self, id: &str) -> Result<Hospital> {
        match self.repository.get_by_id(id).await {
            Ok(Some(hospital)) => Ok(hospital),
            Ok(None) => Err(HospitalAssistantError::NotFound(id.to_string())),
            Err(e) => {
                tracing::error!("Failed to fetch hospital {}: {}", id, e);
                self.notifier.notify_error("Failed to fetch hospital details");
                Err(e)
            }
        }
    }

    pub async fn add_hospital(&self, input: HospitalCreateInput) -> Result<Hospital> {
        match self.repository.create(input).await {
            Ok(hospital) => {
                self.publish(|list| list.push(hospital.clone()));
                self.notifier.notify_success("Hospital created successfully");
                self.refilter().await;
                Ok(hospital)
            }
            Err(e) => {
                tracing::error!("Failed to create hospital: {}", e);
                self.notifier.notify_error("Failed to create hospital");
                Err(e)
            }
        }
    }

    pub async fn update_hospital(&self, id: &str, updates: HospitalUpdateInput) -> Result<Hospital> {
        let result = self.repository.update(id, updates).await;
        self.finish_update(id, result, "Hospital updated successfully", "Failed to update hospital")
            .await
    }

    pub async fn add_details(&self, id: &str, details: HospitalDetailsInput) -> Result<Hospital> {
        let result = self.repository.add_details(id, details).await;
        self.finish_update(
            id,
            result,
            "Hospital details added successfully",
            "Failed to add hospital details",
        )
        .await
    }

    async fn finish_update(
        &self,
        id: &str,
        result: Result<Option<Hospital>>,
        success: &str,
        failure: &str,
    ) -> Result<Hospital> {
        match result {
            Ok(Some(updated)) => {
                self.publish(|list| {
                    for hospital in list.iter_mut().filter(|h| h.id == id) {
                        *hospital = updated.clone();
                    }
                });
                self.notifier.notify_success(success);
                self.refilter().await;
                Ok(updated)
            }
            Ok(None) => Err(HospitalAssistantError::NotFound(id.to_string())),
            Err(e) => {
                tracing::error!("{} {}: {}", failure, id, e);
                self.notifier.notify_error(failure);
                Err(e)
            }
        }
    }

    pub async fn remove_hospital(&self, id: &str) -> Result<bool> {
        match self.repository.delete(id).await {
            Ok(true) => {
                self.publish(|list| list.retain(|h| h.id != id));
                self.notifier.notify_success("Hospital deleted successfully");
                self.refilter().await;
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                tracing::error!("Failed to delete hospital {}: {}", id, e);
                self.notifier.notify_error("Failed to delete hospital");
                Err(e)
            }
        }
    }

    /// Applies `change` under the channel's write lock so concurrent
    /// mutations never overwrite each other
    fn publish(&self, change: impl FnOnce(&mut Vec<Hospital>)) {
        self.hospitals.send_modify(|list| change(Arc::make_mut(list)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{ChannelNotifier, NotificationLevel};
    use crate::repository::InMemoryHospitalRepository;
    use crate::repository_traits::MockHospitalRepository;
    use std::time::Duration;

    fn directory() -> (
        HospitalDirectory<InMemoryHospitalRepository>,
        tokio::sync::broadcast::Receiver<crate::notify::Notification>,
    ) {
        let notifier = ChannelNotifier::new(16);
        let rx = notifier.subscribe();
        let repo = Arc::new(InMemoryHospitalRepository::with_sample_data(Duration::ZERO));
        (HospitalDirectory::new(repo, Arc::new(notifier)), rx)
    }

    fn create_input() -> HospitalCreateInput {
        HospitalCreateInput {
            name: "Lilavati Hospital".into(),
            city: "Mumbai".into(),
            image_url: "https://example.com/l.jpg".into(),
            specialities: vec!["Cardiology".into()],
            rating: 4.6,
        }
    }

    #[tokio::test]
    async fn refresh_publishes_to_subscribers() {
        let (directory, _rx) = directory();
        let feed = directory.subscribe();
        assert!(feed.borrow().is_empty());

        directory.refresh().await.unwrap();
        assert_eq!(feed.borrow().len(), 5);
        assert_eq!(directory.filtered_hospitals().len(), 5);
    }

    #[tokio::test]
    async fn city_filter_tracks_mutations() {
        let (directory, _rx) = directory();
        directory.refresh().await.unwrap();

        let mumbai = directory.select_city("mumbai").await.unwrap();
        assert_eq!(mumbai.len(), 1);

        directory.add_hospital(create_input()).await.unwrap();
        let names: Vec<_> = directory
            .filtered_hospitals()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["Max Healthcare", "Lilavati Hospital"]);
        assert_eq!(directory.hospitals().len(), 6);

        directory.select_city("").await.unwrap();
        assert_eq!(directory.filtered_hospitals().len(), 6);
    }

    #[tokio::test]
    async fn mutations_notify_success() {
        let (directory, mut rx) = directory();
        directory.refresh().await.unwrap();

        directory
            .update_hospital(
                "1",
                HospitalUpdateInput {
                    rating: Some(4.7),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let note = rx.recv().await.unwrap();
        assert_eq!(note.level, NotificationLevel::Success);
        assert_eq!(note.message, "Hospital updated successfully");
        assert_eq!(directory.hospitals()[0].rating, 4.7);

        assert!(directory.remove_hospital("1").await.unwrap());
        assert_eq!(rx.recv().await.unwrap().message, "Hospital deleted successfully");
        assert_eq!(directory.hospitals().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_mutations_are_all_published() {
        let repo = Arc::new(InMemoryHospitalRepository::with_sample_data(Duration::ZERO));
        let directory = Arc::new(HospitalDirectory::new(
            repo.clone(),
            Arc::new(ChannelNotifier::new(16)),
        ));
        directory.refresh().await.unwrap();

        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let directory = directory.clone();
                tokio::spawn(async move { directory.add_hospital(create_input()).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = repo.get_all().await.unwrap();
        assert_eq!(stored.len(), 205);
        assert_eq!(directory.hospitals().len(), stored.len());
    }

    #[tokio::test]
    async fn unknown_hospital_is_not_found() {
        let (directory, _rx) = directory();
        let err = directory.get_hospital("nope").await.unwrap_err();
        assert!(matches!(err, HospitalAssistantError::NotFound(_)));
        assert!(!directory.remove_hospital("nope").await.unwrap());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_snapshot() {
        let mut repo = MockHospitalRepository::new();
        let mut calls = 0;
        repo.expect_get_all().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(crate::repository::sample_hospitals())
            } else {
                Err(HospitalAssistantError::Internal("store offline".into()))
            }
        });

        let notifier = ChannelNotifier::new(4);
        let mut rx = notifier.subscribe();
        let directory = HospitalDirectory::new(Arc::new(repo), Arc::new(notifier));

        directory.refresh().await.unwrap();
        assert!(directory.refresh().await.is_err());
        assert_eq!(directory.hospitals().len(), 5);
        assert_eq!(
            directory.view().error.as_deref(),
            Some("Failed to load hospitals")
        );

        let note = rx.recv().await.unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.message, "Failed to load hospitals");
    }
}
