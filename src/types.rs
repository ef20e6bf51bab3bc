// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a country, state or city.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ===== Collaborator payloads =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Everything else the list endpoint returns, kept as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JobSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: JobId::new(id),
            title: None,
            company: None,
            location: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FavoriteRecord {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(job_id),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
}

/// One page of the job list.
#[derive(Debug, Clone, PartialEq)]
pub struct JobsPage {
    pub data: Vec<JobSummary>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FavoritesPage {
    pub data: Vec<FavoriteRecord>,
}

/// Parameters of the list-jobs call. Location filters travel as arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListJobsRequest {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub country: Vec<LocationId>,
    pub state: Vec<LocationId>,
    pub city: Vec<LocationId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_summary_keeps_unknown_fields() {
        let job: JobSummary = serde_json::from_value(json!({
            "id": "job-42",
            "title": "Rust Engineer",
            "salary": {"min": 90000, "max": 120000}
        }))
        .unwrap();

        assert_eq!(job.id, JobId::from("job-42"));
        assert_eq!(job.title.as_deref(), Some("Rust Engineer"));
        assert!(job.company.is_none());
        assert_eq!(job.extra["salary"]["max"], json!(120000));
    }

    #[test]
    fn test_favorite_record_reads_camel_case_job_id() {
        let record: FavoriteRecord =
            serde_json::from_value(json!({"id": "fav-1", "jobId": "job-7"})).unwrap();
        assert_eq!(record.job_id.as_str(), "job-7");
        assert_eq!(record.extra["id"], json!("fav-1"));
    }
}
