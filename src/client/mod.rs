// src/client/mod.rs
//! Boundary to the jobs API. The session only ever talks to `JobsApi`;
//! transport and auth live in the implementations.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{FavoritesPage, JobId, JobsPage, ListJobsRequest};

pub mod http;

pub use http::HttpJobsApi;

#[async_trait]
pub trait JobsApi: Send + Sync {
    /// One page of jobs matching the filters.
    async fn list_jobs(&self, request: &ListJobsRequest) -> Result<JobsPage, ApiError>;

    /// The caller's saved jobs.
    async fn list_favorites(&self, page: u32, limit: u32) -> Result<FavoritesPage, ApiError>;

    /// Toggle the saved state of a job on the server.
    async fn save_job(&self, job_id: &JobId) -> Result<(), ApiError>;
}
