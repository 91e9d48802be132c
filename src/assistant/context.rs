use crate::models::Hospital;

pub const NAME_LABEL: &str = "Hospital Name";
pub const LOCATION_LABEL: &str = "Location";
pub const SPECIALITIES_LABEL: &str = "Specialities";
pub const RATING_LABEL: &str = "Rating";
pub const DESCRIPTION_LABEL: &str = "Description";
pub const DOCTORS_LABEL: &str = "Number of Doctors";
pub const DEPARTMENTS_LABEL: &str = "Number of Departments";

pub const MISSING_DESCRIPTION: &str = "No description available";
pub const MISSING_COUNT: &str = "Information not available";

/// Render the hospital collection as the text a QA model reads.
///
/// One block of labelled lines per hospital, in collection order, blocks
/// separated by a single blank line. An empty collection gives an empty
/// string.
pub fn build_context(hospitals: &[Hospital]) -> String {
    hospitals
        .iter()
        .map(hospital_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn hospital_block(hospital: &Hospital) -> String {
    let description = hospital
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(MISSING_DESCRIPTION);

    format!(
        "{NAME_LABEL}: {}\n\
         {LOCATION_LABEL}: {}\n\
         {SPECIALITIES_LABEL}: {}\n\
         {RATING_LABEL}: {}\n\
         {DESCRIPTION_LABEL}: {}\n\
         {DOCTORS_LABEL}: {}\n\
         {DEPARTMENTS_LABEL}: {}",
        hospital.name,
        hospital.city,
        hospital.specialities.join(", "),
        hospital.rating,
        description,
        count(hospital.number_of_doctors),
        count(hospital.number_of_departments),
    )
}

// Zero counts are treated as unknown
fn count(value: Option<u32>) -> String {
    match value {
        Some(n) if n > 0 => n.to_string(),
        _ => MISSING_COUNT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sample_hospitals;

    fn bare(name: &str) -> Hospital {
        Hospital {
            id: name.to_lowercase(),
            name: name.to_string(),
            city: "Pune".to_string(),
            image_url: "https://example.com/x.jpg".to_string(),
            specialities: vec!["Urology".to_string(), "Pediatrics".to_string()],
            rating: 4.0,
            description: None,
            images: None,
            number_of_doctors: None,
            number_of_departments: Some(0),
        }
    }

    #[test]
    fn empty_collection_builds_empty_context() {
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn one_block_per_hospital_in_order() {
        let hospitals = sample_hospitals();
        let context = build_context(&hospitals);
        let blocks: Vec<&str> = context.split("\n\n").collect();

        assert_eq!(blocks.len(), hospitals.len());
        for (block, hospital) in blocks.iter().zip(&hospitals) {
            assert!(block.starts_with(&format!("Hospital Name: {}\n", hospital.name)));
            assert_eq!(block.lines().count(), 7);
        }
        assert!(!context.contains("\n\n\n"));
        assert!(!context.ends_with('\n'));
    }

    #[test]
    fn renders_apollo_block_exactly() {
        let context = build_context(&sample_hospitals()[..1]);
        assert_eq!(
            context,
            "Hospital Name: Apollo Hospital\n\
             Location: Delhi\n\
             Specialities: Cardiology, Neurology, Orthopedics\n\
             Rating: 4.5\n\
             Description: Apollo Hospital is a state-of-the-art medical facility providing high-quality healthcare services.\n\
             Number of Doctors: 150\n\
             Number of Departments: 20"
        );
    }

    #[test]
    fn absent_fields_use_placeholders() {
        let mut hospital = bare("Ruby Hall");
        hospital.description = Some(String::new());
        let context = build_context(&[hospital]);

        assert!(context.contains("Specialities: Urology, Pediatrics\n"));
        assert!(context.contains("Rating: 4\n"));
        assert!(context.contains("Description: No description available\n"));
        assert!(context.contains("Number of Doctors: Information not available\n"));
        assert!(context.ends_with("Number of Departments: Information not available"));
    }
}
