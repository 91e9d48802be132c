use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{Hospital, HospitalCreateInput, HospitalDetailsInput, HospitalUpdateInput};
pub use crate::repository_traits::HospitalRepository;

/// In-memory implementation of HospitalRepository
///
/// Every call sleeps for `latency` first so callers see the same
/// asynchronous behaviour a remote store would give them.
pub struct InMemoryHospitalRepository {
    hospitals: RwLock<Vec<Hospital>>,
    latency: Duration,
}

impl InMemoryHospitalRepository {
    pub fn new(hospitals: Vec<Hospital>, latency: Duration) -> Self {
        Self {
            hospitals: RwLock::new(hospitals),
            latency,
        }
    }

    pub fn empty(latency: Duration) -> Self {
        Self::new(Vec::new(), latency)
    }

    pub fn with_sample_data(latency: Duration) -> Self {
        Self::new(sample_hospitals(), latency)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl HospitalRepository for InMemoryHospitalRepository {
    async fn get_all(&self) -> Result<Vec<Hospital>> {
        self.simulate_latency().await;
        Ok(self.hospitals.read().await.clone())
    }

    async fn get_by_city(&self, city: &str) -> Result<Vec<Hospital>> {
        self.simulate_latency().await;
        let hospitals = self.hospitals.read().await;
        if city.is_empty() {
            return Ok(hospitals.clone());
        }
        let wanted = city.to_lowercase();
        Ok(hospitals
            .iter()
            .filter(|h| h.city.to_lowercase() == wanted)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Hospital>> {
        self.simulate_latency().await;
        Ok(self
            .hospitals
            .read()
            .await
            .iter()
            .find(|h| h.id == id)
            .cloned())
    }

    async fn create(&self, input: HospitalCreateInput) -> Result<Hospital> {
        self.simulate_latency().await;
        let hospital = Hospital::from_input(input);
        self.hospitals.write().await.push(hospital.clone());
        tracing::debug!("Stored hospital {} ({})", hospital.name, hospital.id);
        Ok(hospital)
    }

    async fn update(&self, id: &str, updates: HospitalUpdateInput) -> Result<Option<Hospital>> {
        self.simulate_latency().await;
        let mut hospitals = self.hospitals.write().await;
        Ok(hospitals.iter_mut().find(|h| h.id == id).map(|hospital| {
            hospital.apply_update(updates);
            hospital.clone()
        }))
    }

    async fn add_details(
        &self,
        id: &str,
        details: HospitalDetailsInput,
    ) -> Result<Option<Hospital>> {
        self.simulate_latency().await;
        let mut hospitals = self.hospitals.write().await;
        Ok(hospitals.iter_mut().find(|h| h.id == id).map(|hospital| {
            hospital.apply_details(details);
            hospital.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.simulate_latency().await;
        let mut hospitals = self.hospitals.write().await;
        let before = hospitals.len();
        hospitals.retain(|h| h.id != id);
        Ok(hospitals.len() < before)
    }
}

fn sample(
    id: &str,
    name: &str,
    city: &str,
    image: &str,
    specialities: [&str; 3],
    rating: f64,
    description: &str,
    doctors: u32,
    departments: u32,
) -> Hospital {
    Hospital {
        id: id.to_string(),
        name: name.to_string(),
        city: city.to_string(),
        image_url: format!("https://images.unsplash.com/{image}"),
        specialities: specialities.iter().map(|s| s.to_string()).collect(),
        rating,
        description: Some(description.to_string()),
        images: Some(vec![format!("https://images.unsplash.com/{image}")]),
        number_of_doctors: Some(doctors),
        number_of_departments: Some(departments),
    }
}

/// The directory's starter data set
pub fn sample_hospitals() -> Vec<Hospital> {
    vec![
        sample(
            "1",
            "Apollo Hospital",
            "Delhi",
            "photo-1587351021759-3e566b3db538",
            ["Cardiology", "Neurology", "Orthopedics"],
            4.5,
            "Apollo Hospital is a state-of-the-art medical facility providing high-quality healthcare services.",
            150,
            20,
        ),
        sample(
            "2",
            "Max Healthcare",
            "Mumbai",
            "photo-1519494026892-80bbd2d6fd0d",
            ["Oncology", "Pediatrics", "Gastroenterology"],
            4.2,
            "Max Healthcare is committed to providing excellent medical care and patient services.",
            120,
            15,
        ),
        sample(
            "3",
            "Fortis Healthcare",
            "Bangalore",
            "photo-1538108149393-fbbd81895907",
            ["Dermatology", "Psychiatry", "Endocrinology"],
            4.0,
            "Fortis Healthcare delivers comprehensive healthcare services with cutting-edge technology.",
            100,
            12,
        ),
        sample(
            "4",
            "AIIMS",
            "Delhi",
            "photo-1586773860418-d37222d8fce3",
            ["Neurosurgery", "Cardiothoracic Surgery", "Nephrology"],
            4.8,
            "AIIMS is a premier medical institution known for its advanced research and exceptional patient care.",
            300,
            30,
        ),
        sample(
            "5",
            "Manipal Hospital",
            "Bangalore",
            "photo-1596541223130-5d31a73fb6c6",
            ["Urology", "Gynecology", "Ophthalmology"],
            4.3,
            "Manipal Hospital offers world-class healthcare services with a patient-centric approach.",
            180,
            22,
        ),
    ]
}
