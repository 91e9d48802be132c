use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Flexible count deserializer to handle string, float, or int inputs from different MCP clients
fn deserialize_flexible_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleCount {
        Int(i64),
        Float(f64),
        String(String),
    }

    let value = Option::<FlexibleCount>::deserialize(deserializer)?;
    let raw = match value {
        None => return Ok(None),
        Some(FlexibleCount::Int(i)) => i,
        Some(FlexibleCount::Float(f)) => {
            if f < 0.0 {
                return Err(serde::de::Error::custom("Cannot be negative"));
            }
            if !f.is_finite() || f.fract() != 0.0 || f > f64::from(u32::MAX) {
                return Err(serde::de::Error::custom("Must be a whole number"));
            }
            f as i64
        }
        Some(FlexibleCount::String(s)) => s.trim().parse::<i64>().map_err(serde::de::Error::custom)?,
    };
    u32::try_from(raw)
        .map(Some)
        .map_err(|_| serde::de::Error::custom("Cannot be negative"))
}

/// A hospital as stored in the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Hospital {
    pub id: String,
    pub name: String,
    pub city: String,
    pub image_url: String,
    pub specialities: Vec<String>,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_doctors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_departments: Option<u32>,
}

impl Hospital {
    /// Build a new record from create input with a freshly generated ID
    pub fn from_input(input: HospitalCreateInput) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            city: input.city,
            image_url: input.image_url,
            specialities: input.specialities,
            rating: input.rating,
            description: None,
            images: None,
            number_of_doctors: None,
            number_of_departments: None,
        }
    }

    /// Merge the present fields of an update into this record
    pub fn apply_update(&mut self, updates: HospitalUpdateInput) {
        if let Some(name) = updates.name {
            self.name = name;
        }
        if let Some(city) = updates.city {
            self.city = city;
        }
        if let Some(image_url) = updates.image_url {
            self.image_url = image_url;
        }
        if let Some(specialities) = updates.specialities {
            self.specialities = specialities;
        }
        if let Some(rating) = updates.rating {
            self.rating = rating;
        }
        if updates.description.is_some() {
            self.description = updates.description;
        }
        if updates.images.is_some() {
            self.images = updates.images;
        }
        if updates.number_of_doctors.is_some() {
            self.number_of_doctors = updates.number_of_doctors;
        }
        if updates.number_of_departments.is_some() {
            self.number_of_departments = updates.number_of_departments;
        }
    }

    pub fn apply_details(&mut self, details: HospitalDetailsInput) {
        self.description = Some(details.description);
        self.images = Some(details.images);
        self.number_of_doctors = Some(details.number_of_doctors);
        self.number_of_departments = Some(details.number_of_departments);
    }
}

/// Fields required to register a hospital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HospitalCreateInput {
    #[schemars(description = "Hospital name (at least 3 characters)")]
    pub name: String,

    #[schemars(description = "City the hospital is located in")]
    pub city: String,

    #[schemars(description = "Cover image URL (http or https)")]
    pub image_url: String,

    #[schemars(description = "Specialities offered, at least one")]
    pub specialities: Vec<String>,

    #[schemars(description = "Rating between 0 and 5")]
    pub rating: f64,
}

/// Extended details attached after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HospitalDetailsInput {
    #[schemars(description = "Free-text description")]
    pub description: String,

    #[schemars(description = "Gallery image URLs")]
    #[serde(default)]
    pub images: Vec<String>,

    #[schemars(description = "Number of doctors on staff")]
    pub number_of_doctors: u32,

    #[schemars(description = "Number of departments")]
    pub number_of_departments: u32,
}

/// Partial update; only present fields are changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HospitalUpdateInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub specialities: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[schemars(description = "Number of doctors on staff")]
    #[serde(default, deserialize_with = "deserialize_flexible_count")]
    pub number_of_doctors: Option<u32>,
    #[schemars(description = "Number of departments")]
    #[serde(default, deserialize_with = "deserialize_flexible_count")]
    pub number_of_departments: Option<u32>,
}

/// Cities offered when registering a hospital
pub const AVAILABLE_CITIES: [&str; 10] = [
    "Delhi",
    "Mumbai",
    "Bangalore",
    "Chennai",
    "Kolkata",
    "Hyderabad",
    "Pune",
    "Ahmedabad",
    "Jaipur",
    "Lucknow",
];

/// Specialities offered when registering a hospital
pub const AVAILABLE_SPECIALITIES: [&str; 15] = [
    "Cardiology",
    "Neurology",
    "Orthopedics",
    "Oncology",
    "Pediatrics",
    "Gastroenterology",
    "Dermatology",
    "Psychiatry",
    "Endocrinology",
    "Neurosurgery",
    "Cardiothoracic Surgery",
    "Nephrology",
    "Urology",
    "Gynecology",
    "Ophthalmology",
];

/// Case-insensitive substring search over the known cities
pub fn matching_cities(term: &str) -> Vec<&'static str> {
    let term = term.trim().to_lowercase();
    AVAILABLE_CITIES
        .iter()
        .copied()
        .filter(|city| term.is_empty() || city.to_lowercase().contains(&term))
        .collect()
}

// ===== Tool parameters =====

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HospitalIdParams {
    #[schemars(description = "Hospital ID")]
    pub id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HospitalListParams {
    #[schemars(description = "Optional city filter (case-insensitive). Omit for all hospitals")]
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SelectCityParams {
    #[schemars(description = "City to filter the directory by; empty string clears the filter")]
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CitySearchParams {
    #[schemars(description = "Search term matched against known city names")]
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HospitalUpdateParams {
    #[schemars(description = "Hospital ID")]
    pub id: String,
    #[schemars(description = "Fields to change")]
    pub updates: HospitalUpdateInput,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HospitalDetailsParams {
    #[schemars(description = "Hospital ID")]
    pub id: String,
    #[schemars(description = "Details to attach")]
    pub details: HospitalDetailsInput,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QaAskParams {
    #[schemars(description = "Free-text question about the hospitals in the directory")]
    pub question: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Hospital {
        Hospital {
            id: "1".into(),
            name: "Apollo Hospital".into(),
            city: "Delhi".into(),
            image_url: "https://example.com/a.jpg".into(),
            specialities: vec!["Cardiology".into()],
            rating: 4.5,
            description: None,
            images: None,
            number_of_doctors: None,
            number_of_departments: None,
        }
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut hospital = sample();
        hospital.apply_update(HospitalUpdateInput {
            rating: Some(4.9),
            number_of_doctors: Some(200),
            ..Default::default()
        });
        assert_eq!(hospital.name, "Apollo Hospital");
        assert_eq!(hospital.rating, 4.9);
        assert_eq!(hospital.number_of_doctors, Some(200));
        assert_eq!(hospital.description, None);
    }

    #[test]
    fn flexible_counts_accept_strings_and_floats() {
        let parsed: HospitalUpdateInput =
            serde_json::from_str(r#"{"number_of_doctors": "150", "number_of_departments": 12.0}"#)
                .unwrap();
        assert_eq!(parsed.number_of_doctors, Some(150));
        assert_eq!(parsed.number_of_departments, Some(12));

        let negative = serde_json::from_str::<HospitalUpdateInput>(r#"{"number_of_doctors": -1}"#);
        assert!(negative.is_err());
    }

    #[test]
    fn fractional_counts_are_rejected() {
        let err = serde_json::from_str::<HospitalUpdateInput>(r#"{"number_of_doctors": -0.5}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Cannot be negative"));

        let err =
            serde_json::from_str::<HospitalUpdateInput>(r#"{"number_of_departments": 2.5}"#)
                .unwrap_err();
        assert!(err.to_string().contains("Must be a whole number"));
    }

    #[test]
    fn city_search_is_case_insensitive() {
        assert_eq!(matching_cities("del"), vec!["Delhi"]);
        assert_eq!(matching_cities("PUR"), vec!["Jaipur"]);
        assert_eq!(matching_cities("").len(), AVAILABLE_CITIES.len());
    }

    #[test]
    fn from_input_generates_unique_ids() {
        let input = HospitalCreateInput {
            name: "City Care".into(),
            city: "Pune".into(),
            image_url: "https://example.com/c.jpg".into(),
            specialities: vec!["Urology".into()],
            rating: 3.9,
        };
        let a = Hospital::from_input(input.clone());
        let b = Hospital::from_input(input);
        assert_ne!(a.id, b.id);
        assert!(a.description.is_none());
    }
}
