//! Wire DTOs for the `/automation/v2/secrets` surface (spec §6).

use std::collections::HashMap;

use secret_store::{Id, Secret};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct CreateSecretRequestDto {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default, rename = "type")]
    pub secret_type: Option<String>,
    #[serde(default)]
    pub expiry: i64,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Deserialize)]
pub struct CreateOrUpdateSecretRequestDto {
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default, rename = "type")]
    pub secret_type: Option<String>,
    #[serde(default)]
    pub expiry: i64,
}

#[derive(Serialize)]
pub struct SeriesDto {
    pub id: Id,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub secret_type: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub created_by: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub updated_by: String,
    pub current_version_id: Option<Id>,
}

#[derive(Serialize)]
pub struct SecretDetailDto {
    pub series: SeriesDto,
    pub expiry: i64,
}

impl From<Secret> for SecretDetailDto {
    fn from(s: Secret) -> Self {
        let expiry = s.current.expiry;
        Self {
            series: SeriesDto {
                id: s.series.id,
                name: s.series.name,
                description: s.series.description,
                secret_type: s.series.secret_type,
                created_at: s.series.created_at,
                created_by: s.series.created_by,
                updated_at: s.series.updated_at,
                updated_by: s.series.updated_by,
                current_version_id: s.series.current_version_id,
            },
            expiry,
        }
    }
}

#[derive(Deserialize)]
pub struct SetVersionRequestDto {
    #[allow(dead_code)]
    pub name: String,
    pub version: Id,
}

#[derive(Deserialize)]
pub struct GroupsPatchRequestDto {
    #[serde(default, rename = "addGroups")]
    pub add_groups: Vec<String>,
    #[serde(default, rename = "removeGroups")]
    pub remove_groups: Vec<String>,
}
