//! Client-side job search coordinator: debounced search, keyed cached
//! job-list and favorites queries, the location filter cascade, and
//! optimistic save/unsave with rollback.

pub mod cli;
pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod filters;
pub mod notify;
pub mod pagination;
pub mod query;
pub mod saved;
pub mod session;
pub mod types;
pub mod utils;

pub use client::{HttpJobsApi, JobsApi};
pub use config::{ApiConfig, AppConfig, SearchSettings};
pub use error::ApiError;
pub use filters::FilterTuple;
pub use notify::{Notification, NotificationKind};
pub use pagination::PaginationSummary;
pub use saved::{merged_saved, OptimisticOverlay, SaveDirection};
pub use session::{JobSearchSession, SessionMode};
pub use types::{FavoriteRecord, JobId, JobSummary, JobsPage, LocationId};
