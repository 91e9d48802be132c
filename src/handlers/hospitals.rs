use serde_json::{Value, json};

use super::ToolHandlers;
use crate::error::Result;
use crate::models::{
    AVAILABLE_SPECIALITIES, CitySearchParams, HospitalCreateInput, HospitalDetailsParams,
    HospitalIdParams, HospitalListParams, HospitalUpdateParams, SelectCityParams,
    matching_cities,
};
use crate::repository_traits::HospitalRepository;

impl<R: HospitalRepository> ToolHandlers<R> {
    pub async fn hospital_list(&self, params: HospitalListParams) -> Result<Value> {
        let city = params.city.unwrap_or_default();
        let city = city.trim();
        if city.is_empty() {
            return Ok(serde_json::to_value(self.directory.view())?);
        }

        let wanted = city.to_lowercase();
        let hospitals: Vec<_> = self
            .directory
            .hospitals()
            .iter()
            .filter(|h| h.city.to_lowercase() == wanted)
            .cloned()
            .collect();
        Ok(json!({
            "city": city,
            "count": hospitals.len(),
            "hospitals": hospitals,
        }))
    }

    pub async fn hospital_get(&self, params: HospitalIdParams) -> Result<Value> {
        let hospital = self.directory.get_hospital(&params.id).await?;
        Ok(serde_json::to_value(hospital)?)
    }

    pub fn hospital_cities(&self, params: CitySearchParams) -> Value {
        json!({
            "cities": matching_cities(&params.term),
            "specialities": AVAILABLE_SPECIALITIES,
        })
    }

    pub async fn hospital_select_city(&self, params: SelectCityParams) -> Result<Value> {
        self.directory.select_city(&params.city).await?;
        Ok(serde_json::to_value(self.directory.view())?)
    }

    pub async fn hospital_create(&self, input: HospitalCreateInput) -> Result<Value> {
        self.policy.require_admin(&self.principal, "add hospitals")?;
        self.validator.validate_create(&input)?;
        let hospital = self.directory.add_hospital(input).await?;
        tracing::info!("Created hospital {} ({})", hospital.name, hospital.id);
        Ok(serde_json::to_value(hospital)?)
    }

    pub async fn hospital_update(&self, params: HospitalUpdateParams) -> Result<Value> {
        self.policy.require_admin(&self.principal, "edit hospitals")?;
        self.validator.validate_update(&params.updates)?;
        let hospital = self
            .directory
            .update_hospital(&params.id, params.updates)
            .await?;
        Ok(serde_json::to_value(hospital)?)
    }

    pub async fn hospital_add_details(&self, params: HospitalDetailsParams) -> Result<Value> {
        self.policy
            .require_admin(&self.principal, "add hospital details")?;
        self.validator.validate_details(&params.details)?;
        let hospital = self
            .directory
            .add_details(&params.id, params.details)
            .await?;
        Ok(serde_json::to_value(hospital)?)
    }

    pub async fn hospital_delete(&self, params: HospitalIdParams) -> Result<Value> {
        self.policy.require_admin(&self.principal, "delete hospitals")?;
        let deleted = self.directory.remove_hospital(&params.id).await?;
        if !deleted {
            tracing::warn!("Delete requested for unknown hospital {}", params.id);
        }
        Ok(json!({ "id": params.id, "deleted": deleted }))
    }
}
