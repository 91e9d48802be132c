use crate::error::Result;
use crate::models::{Hospital, HospitalCreateInput, HospitalDetailsInput, HospitalUpdateInput};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Storage operations for hospital records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HospitalRepository: Send + Sync + 'static {
    /// All hospitals in insertion order
    async fn get_all(&self) -> Result<Vec<Hospital>>;

    /// Hospitals whose city matches case-insensitively; an empty city returns all
    async fn get_by_city(&self, city: &str) -> Result<Vec<Hospital>>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Hospital>>;

    async fn create(&self, input: HospitalCreateInput) -> Result<Hospital>;

    /// Merge present fields; `None` when the ID is unknown
    async fn update(&self, id: &str, updates: HospitalUpdateInput) -> Result<Option<Hospital>>;

    async fn add_details(
        &self,
        id: &str,
        details: HospitalDetailsInput,
    ) -> Result<Option<Hospital>>;

    /// True if a record was removed
    async fn delete(&self, id: &str) -> Result<bool>;
}
