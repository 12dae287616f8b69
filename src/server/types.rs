use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::family::FamilyError;

#[derive(Debug, Deserialize)]
pub struct CreatePersonRequest {
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
}

impl CreatePersonRequest {
    pub fn validate(&self) -> Result<(), FamilyError> {
        validate_full_name(&self.full_name)?;
        if let Some(url) = &self.photo_url {
            validate_photo_url(url)?;
        }
        Ok(())
    }
}

/// Partial update. A missing field keeps its stored value; an explicit `null`
/// clears the nullable ones.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePersonRequest {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub death_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_url: Option<Option<String>>,
}

impl UpdatePersonRequest {
    pub fn validate(&self) -> Result<(), FamilyError> {
        if let Some(name) = &self.full_name {
            validate_full_name(name)?;
        }
        if let Some(Some(url)) = &self.photo_url {
            validate_photo_url(url)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRelationshipRequest {
    pub parent_id: i32,
    pub child_id: i32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResponse {
    pub success: bool,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_full_name(name: &str) -> Result<(), FamilyError> {
    if name.trim().is_empty() {
        return Err(FamilyError::Validation(String::from(
            "full_name must not be empty",
        )));
    }
    Ok(())
}

fn validate_photo_url(raw: &str) -> Result<(), FamilyError> {
    let url = Url::parse(raw)
        .map_err(|e| FamilyError::Validation(format!("photo_url '{raw}' is not a valid URL: {e}")))?;
    if !url.has_host() {
        return Err(FamilyError::Validation(format!(
            "photo_url '{raw}' must be an absolute URL with a host"
        )));
    }
    Ok(())
}
