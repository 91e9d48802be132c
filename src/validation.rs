use reqwest::Url;

use crate::error::{HospitalAssistantError, Result};
use crate::models::{HospitalCreateInput, HospitalDetailsInput, HospitalUpdateInput};

const MIN_NAME_LEN: usize = 3;
const MAX_RATING: f64 = 5.0;

/// Validates hospital input before it reaches the repository
#[derive(Debug, Default, Clone)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_create(&self, input: &HospitalCreateInput) -> Result<()> {
        self.validate_name(&input.name)?;
        self.validate_city(&input.city)?;
        self.validate_url("image_url", &input.image_url)?;
        self.validate_specialities(&input.specialities)?;
        self.validate_rating(input.rating)
    }

    pub fn validate_update(&self, updates: &HospitalUpdateInput) -> Result<()> {
        if let Some(name) = &updates.name {
            self.validate_name(name)?;
        }
        if let Some(city) = &updates.city {
            self.validate_city(city)?;
        }
        if let Some(url) = &updates.image_url {
            self.validate_url("image_url", url)?;
        }
        if let Some(specialities) = &updates.specialities {
            self.validate_specialities(specialities)?;
        }
        if let Some(rating) = updates.rating {
            self.validate_rating(rating)?;
        }
        if let Some(images) = &updates.images {
            self.validate_images(images)?;
        }
        Ok(())
    }

    pub fn validate_details(&self, details: &HospitalDetailsInput) -> Result<()> {
        self.validate_images(&details.images)
    }

    fn validate_name(&self, name: &str) -> Result<()> {
        if name.trim().chars().count() < MIN_NAME_LEN {
            return Err(HospitalAssistantError::validation(
                "name",
                "Name must be at least 3 characters",
            ));
        }
        Ok(())
    }

    fn validate_city(&self, city: &str) -> Result<()> {
        if city.trim().is_empty() {
            return Err(HospitalAssistantError::validation("city", "City is required"));
        }
        Ok(())
    }

    fn validate_specialities(&self, specialities: &[String]) -> Result<()> {
        if specialities.iter().all(|s| s.trim().is_empty()) {
            return Err(HospitalAssistantError::validation(
                "specialities",
                "At least one speciality is required",
            ));
        }
        Ok(())
    }

    fn validate_rating(&self, rating: f64) -> Result<()> {
        if rating.is_nan() || rating < 0.0 {
            return Err(HospitalAssistantError::validation(
                "rating",
                "Minimum rating is 0",
            ));
        }
        if rating > MAX_RATING {
            return Err(HospitalAssistantError::validation(
                "rating",
                "Maximum rating is 5",
            ));
        }
        Ok(())
    }

    fn validate_images(&self, images: &[String]) -> Result<()> {
        for image in images {
            self.validate_url("images", image)?;
        }
        Ok(())
    }

    fn validate_url(&self, field: &str, raw: &str) -> Result<()> {
        let valid = Url::parse(raw.trim())
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
            .unwrap_or(false);
        if !valid {
            return Err(HospitalAssistantError::validation(field, "Must be a valid URL"));
        }
        Ok(())
    }
}
