// src/client/http.rs
//! reqwest-backed implementation of the jobs API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, trace};

use super::JobsApi;
use crate::error::ApiError;
use crate::types::{FavoriteRecord, FavoritesPage, JobId, JobSummary, JobsPage, ListJobsRequest, PageMeta};

const JOBS_ENDPOINT: &str = "/jobs";
const FAVORITES_ENDPOINT: &str = "/jobs/favorites";
const SAVE_ENDPOINT: &str = "/jobs/save";

#[derive(Debug, Deserialize)]
struct JobsEnvelope {
    data: Option<Vec<JobSummary>>,
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct FavoritesEnvelope {
    data: Option<Vec<FavoriteRecord>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpJobsApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpJobsApi {
    /// Create a client. Without a timeout the transport default applies.
    pub fn new(base_url: &str, token: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("jobsearch/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        trace!("Response status: {}", status);

        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse jobs API response: {}", e);
            ApiError::InvalidResponse(e.to_string())
        })
    }
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or(body);

    error!("Jobs API error {}: {}", status, message);
    ApiError::Http { status, message }
}

fn list_jobs_query(request: &ListJobsRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("page", request.page.to_string()),
        ("limit", request.limit.to_string()),
    ];
    if let Some(search) = &request.search {
        query.push(("search", search.clone()));
    }
    query.extend(request.country.iter().map(|id| ("country", id.to_string())));
    query.extend(request.state.iter().map(|id| ("state", id.to_string())));
    query.extend(request.city.iter().map(|id| ("city", id.to_string())));
    query
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    async fn list_jobs(&self, request: &ListJobsRequest) -> Result<JobsPage, ApiError> {
        let url = self.url(JOBS_ENDPOINT);
        debug!("Listing jobs: {} page {}", url, request.page);

        let response = self
            .send(self.client.get(&url).query(&list_jobs_query(request)))
            .await?;
        let envelope: JobsEnvelope = Self::read_json(response).await?;

        let data = envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse("list jobs response has no data".to_string()))?;
        let meta = envelope.meta.unwrap_or(PageMeta {
            total: data.len() as u64,
        });

        Ok(JobsPage { data, meta })
    }

    async fn list_favorites(&self, page: u32, limit: u32) -> Result<FavoritesPage, ApiError> {
        let url = self.url(FAVORITES_ENDPOINT);
        debug!("Listing favorites: {}", url);

        let response = self
            .send(
                self.client
                    .get(&url)
                    .query(&[("page", page.to_string()), ("limit", limit.to_string())]),
            )
            .await?;
        let envelope: FavoritesEnvelope = Self::read_json(response).await?;

        let data = envelope.data.ok_or_else(|| {
            ApiError::InvalidResponse("list favorites response has no data".to_string())
        })?;

        Ok(FavoritesPage { data })
    }

    async fn save_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        let url = self.url(SAVE_ENDPOINT);
        debug!("Toggling saved job {}: {}", job_id, url);

        let payload = serde_json::json!({ "jobId": job_id });
        self.send(self.client.post(&url).json(&payload)).await?;
        Ok(())
    }
}
