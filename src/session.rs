// src/session.rs
//! Job search session: owns the filter tuple, the keyed job and favorites
//! caches, and the optimistic saved overlay for one search screen.
//!
//! The handle is cheap to clone. State sits behind a mutex that is never
//! held across an await, so readers always see a consistent snapshot
//! while fetches and saves are in flight. Intents update the filter tuple
//! synchronously and publish it on a watch channel; `refresh()` brings the
//! queries in line with the current tuple.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::client::JobsApi;
use crate::config::SearchSettings;
use crate::debounce::Debouncer;
use crate::error::ApiError;
use crate::filters::FilterTuple;
use crate::notify::{Notification, Notifier, SAVE_FAILED_FALLBACK};
use crate::pagination::PaginationSummary;
use crate::query::{fetch_with_retry, InFlight, InFlightGuard, QueryCache};
use crate::saved::{merged_saved, server_saved_ids, OptimisticOverlay, SaveDirection};
use crate::types::{JobId, JobSummary, JobsPage, LocationId};
use crate::utils::lock;

const FAVORITES_KEY: &str = "favorites";
const FAVORITES_PAGE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Authenticated,
    /// No favorites, no saving, no pagination.
    Public,
}

impl SessionMode {
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    input_search_term: String,
    filters: FilterTuple,
    /// Last page shown for any tuple; stays visible while a new one loads.
    displayed: Option<Arc<JobsPage>>,
    overlay: OptimisticOverlay,
    jobs_error: Option<(FilterTuple, ApiError)>,
    favorites_error: Option<ApiError>,
}

struct Inner {
    api: Arc<dyn JobsApi>,
    settings: SearchSettings,
    mode: SessionMode,
    state: Mutex<SessionState>,
    jobs_cache: QueryCache<FilterTuple, JobsPage>,
    favorites_cache: QueryCache<&'static str, BTreeSet<JobId>>,
    jobs_in_flight: InFlight,
    favorites_in_flight: InFlight,
    saving: InFlight,
    /// Bumped whenever a save starts or settles; favorites fetches issued
    /// under an older generation may miss that save and are discarded.
    favorites_generation: AtomicU64,
    filter_tx: watch::Sender<FilterTuple>,
    notifier: Notifier,
    search_debouncer: Debouncer<String>,
}

impl Inner {
    fn commit_search(&self, term: &str) {
        let mut state = lock(&self.state);
        if state.filters.commit_search(term) {
            debug!("Search term committed: {:?}", state.filters.search_term);
            self.filter_tx.send_replace(state.filters.clone());
        }
    }

    fn bump_favorites_generation(&self) {
        self.favorites_generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Optimistic flip of one job. Dropping it without `confirm` puts the
/// overlay entry back, so a cancelled save leaves no phantom state.
struct PendingSave<'a> {
    inner: &'a Inner,
    job_id: JobId,
    previous: Option<bool>,
    confirmed: bool,
    _saving: InFlightGuard<'a>,
}

impl PendingSave<'_> {
    fn confirm(mut self) {
        self.confirmed = true;
    }
}

impl Drop for PendingSave<'_> {
    fn drop(&mut self) {
        if !self.confirmed {
            debug!("Restoring saved state of {}", self.job_id);
            lock(&self.inner.state)
                .overlay
                .restore(&self.job_id, self.previous);
        }
        self.inner.bump_favorites_generation();
    }
}

#[derive(Clone)]
pub struct JobSearchSession {
    inner: Arc<Inner>,
}

impl JobSearchSession {
    /// Start a session. The receiver yields the notifications raised by
    /// saves; dropping it silences them.
    pub fn new(
        api: Arc<dyn JobsApi>,
        settings: SearchSettings,
        mode: SessionMode,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notifier, notifications) = Notifier::channel();
        let (filter_tx, _) = watch::channel(FilterTuple::default());

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let search_debouncer = Debouncer::new(settings.debounce(), move |term: String| {
                if let Some(inner) = weak.upgrade() {
                    inner.commit_search(&term);
                }
            });

            Inner {
                api,
                jobs_cache: QueryCache::new(settings.jobs_cache()),
                favorites_cache: QueryCache::new(settings.favorites_cache()),
                settings,
                mode,
                state: Mutex::new(SessionState::default()),
                jobs_in_flight: InFlight::default(),
                favorites_in_flight: InFlight::default(),
                saving: InFlight::default(),
                favorites_generation: AtomicU64::new(0),
                filter_tx,
                notifier,
                search_debouncer,
            }
        });

        info!("Job search session started ({:?})", mode);
        (Self { inner }, notifications)
    }

    pub fn mode(&self) -> SessionMode {
        self.inner.mode
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.inner.settings
    }

    /// Receiver that wakes whenever the filter tuple changes.
    pub fn filter_changes(&self) -> watch::Receiver<FilterTuple> {
        self.inner.filter_tx.subscribe()
    }

    pub fn filters(&self) -> FilterTuple {
        lock(&self.inner.state).filters.clone()
    }

    // ===== Filter intents =====

    pub fn input_search_term(&self) -> String {
        lock(&self.inner.state).input_search_term.clone()
    }

    /// Echo the raw text now; commit it once typing pauses.
    pub fn set_input_search_term(&self, text: impl Into<String>) {
        let text = text.into();
        lock(&self.inner.state).input_search_term = text.clone();
        self.inner.search_debouncer.push(text);
    }

    /// Commit the raw text immediately, skipping the debounce wait.
    pub fn handle_search(&self) {
        self.inner.search_debouncer.cancel();
        let text = self.input_search_term();
        self.inner.commit_search(&text);
    }

    pub fn handle_country_change(&self, country: Option<LocationId>) {
        self.update_filters(|filters| filters.set_country(country));
    }

    pub fn handle_state_change(&self, state: Option<LocationId>) {
        self.update_filters(|filters| filters.set_state(state));
    }

    pub fn handle_city_change(&self, city: Option<LocationId>) {
        self.update_filters(|filters| filters.set_city(city));
    }

    /// Advance to the next page. Returns false when there is nothing more
    /// to load, a fetch is already running, or the session is public.
    pub fn load_more(&self) -> bool {
        if self.inner.mode.is_public() {
            return false;
        }
        if self.is_fetching() || !self.has_more() {
            debug!("load_more ignored");
            return false;
        }

        self.update_filters(|filters| {
            filters.next_page();
            true
        })
    }

    fn update_filters<F>(&self, transition: F) -> bool
    where
        F: FnOnce(&mut FilterTuple) -> bool,
    {
        let mut state = lock(&self.inner.state);
        let changed = transition(&mut state.filters);
        debug_assert!(state.filters.is_consistent(), "{:?}", state.filters);
        if changed {
            debug!("Filters changed: {:?}", state.filters);
            self.inner.filter_tx.send_replace(state.filters.clone());
        }
        changed
    }

    // ===== Derived views =====

    fn current_page(&self) -> Option<Arc<JobsPage>> {
        let filters = self.filters();
        self.inner
            .jobs_cache
            .get(&filters)
            .or_else(|| lock(&self.inner.state).displayed.clone())
    }

    pub fn jobs(&self) -> Vec<JobSummary> {
        self.current_page()
            .map(|page| page.data.clone())
            .unwrap_or_default()
    }

    pub fn total_jobs(&self) -> u64 {
        self.current_page().map(|page| page.meta.total).unwrap_or(0)
    }

    pub fn pagination(&self) -> PaginationSummary {
        let page = self.filters().page;
        PaginationSummary::new(self.total_jobs(), page, self.inner.settings.page_size)
    }

    pub fn has_more(&self) -> bool {
        self.pagination().has_more
    }

    /// A jobs fetch is running and there is nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.inner.jobs_in_flight.is_active() && self.current_page().is_none()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.jobs_in_flight.is_active()
    }

    pub fn is_saving(&self) -> bool {
        self.inner.saving.is_active()
    }

    fn server_ids(&self) -> Arc<BTreeSet<JobId>> {
        self.inner
            .favorites_cache
            .get(&FAVORITES_KEY)
            .unwrap_or_default()
    }

    pub fn saved_job_ids(&self) -> BTreeSet<JobId> {
        let server = self.server_ids();
        merged_saved(&server, &lock(&self.inner.state).overlay)
    }

    pub fn is_saved(&self, job_id: &JobId) -> bool {
        self.saved_job_ids().contains(job_id)
    }

    pub fn pending_overlay(&self) -> OptimisticOverlay {
        lock(&self.inner.state).overlay.clone()
    }

    /// Error of the last jobs fetch for the current filters.
    pub fn jobs_error(&self) -> Option<ApiError> {
        let state = lock(&self.inner.state);
        state
            .jobs_error
            .as_ref()
            .filter(|(key, _)| *key == state.filters)
            .map(|(_, e)| e.clone())
    }

    pub fn favorites_error(&self) -> Option<ApiError> {
        lock(&self.inner.state).favorites_error.clone()
    }

    // ===== Queries =====

    /// Load jobs for the current filters and, when signed in, favorites.
    /// Fresh cache entries are served without a request.
    ///
    /// Only the jobs outcome is returned; a favorites failure is kept in
    /// `favorites_error()` and does not fail the listing.
    pub async fn refresh(&self) -> Result<Arc<JobsPage>, ApiError> {
        let (jobs, favorites) = tokio::join!(self.fetch_jobs(false), self.fetch_favorites(false));
        if let Err(e) = favorites {
            warn!("Listing jobs without saved state: {}", e);
        }
        jobs
    }

    /// Re-run the queries that ended in an error, ignoring freshness.
    pub async fn retry(&self) -> Result<(), ApiError> {
        let jobs = match self.jobs_error() {
            Some(_) => self.fetch_jobs(true).await.map(drop),
            None => Ok(()),
        };
        let favorites = match self.favorites_error() {
            Some(_) => self.fetch_favorites(true).await.map(drop),
            None => Ok(()),
        };
        jobs.and(favorites)
    }

    pub async fn fetch_jobs(&self, force: bool) -> Result<Arc<JobsPage>, ApiError> {
        let key = self.filters();

        if !force {
            if let Some(page) = self.inner.jobs_cache.get_fresh(&key) {
                debug!("Jobs cache hit for page {}", key.page);
                self.show_page(&key, &page);
                return Ok(page);
            }
        }

        let request = key.to_request(self.inner.settings.page_size);
        let api = &self.inner.api;
        let result = {
            let _in_flight = self.inner.jobs_in_flight.enter();
            fetch_with_retry("list jobs", &self.inner.settings.retry(), || async {
                api.list_jobs(&request).await
            })
            .await
        };

        match result {
            Ok(page) => {
                debug!(
                    "Fetched {} jobs (total {}) for page {}",
                    page.data.len(),
                    page.meta.total,
                    key.page
                );
                let page = self.inner.jobs_cache.insert(key.clone(), page);
                self.show_page(&key, &page);
                Ok(page)
            }
            Err(e) => {
                error!("Failed to fetch jobs: {}", e);
                lock(&self.inner.state).jobs_error = Some((key, e.clone()));
                Err(e)
            }
        }
    }

    /// Responses for a superseded tuple stay in the cache only.
    fn show_page(&self, key: &FilterTuple, page: &Arc<JobsPage>) {
        let mut state = lock(&self.inner.state);
        if state.filters == *key {
            state.displayed = Some(Arc::clone(page));
        }
        if state.jobs_error.as_ref().is_some_and(|(failed, _)| failed == key) {
            state.jobs_error = None;
        }
    }

    /// Fetch the saved-job list. Never issued in public mode.
    pub async fn fetch_favorites(&self, force: bool) -> Result<Arc<BTreeSet<JobId>>, ApiError> {
        if self.inner.mode.is_public() {
            return Ok(Arc::default());
        }

        if !force {
            if let Some(ids) = self.inner.favorites_cache.get_fresh(&FAVORITES_KEY) {
                debug!("Favorites cache hit");
                return Ok(ids);
            }
        }

        let generation = self.inner.favorites_generation.load(Ordering::SeqCst);
        let api = &self.inner.api;
        let limit = self.inner.settings.favorites_limit;
        let result = {
            let _in_flight = self.inner.favorites_in_flight.enter();
            fetch_with_retry("list favorites", &self.inner.settings.retry(), || async {
                api.list_favorites(FAVORITES_PAGE, limit).await
            })
            .await
        };

        if self.inner.favorites_generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding favorites response issued before a save settled");
            return result.map(|page| Arc::new(server_saved_ids(&page.data)));
        }

        match result {
            Ok(page) => {
                let ids = self
                    .inner
                    .favorites_cache
                    .insert(FAVORITES_KEY, server_saved_ids(&page.data));

                let mut state = lock(&self.inner.state);
                state.favorites_error = None;
                // Server truth wins once no save is waiting on it.
                if !self.inner.saving.is_active() && !state.overlay.is_empty() {
                    debug!("Clearing {} optimistic entries", state.overlay.len());
                    state.overlay.clear();
                }
                Ok(ids)
            }
            Err(e) => {
                error!("Failed to fetch favorites: {}", e);
                lock(&self.inner.state).favorites_error = Some(e.clone());
                Err(e)
            }
        }
    }

    // ===== Mutations =====

    /// Toggle the saved state of `job_id` optimistically.
    ///
    /// The merged saved set flips before the request is sent. On success
    /// the favorites are refetched and a notification names the direction;
    /// on failure the flip is undone and the error is reported.
    /// Returns `None` in public mode, where nothing is sent.
    pub async fn handle_save(&self, job_id: JobId) -> Result<Option<SaveDirection>, ApiError> {
        if self.inner.mode.is_public() {
            info!("Save of {} ignored in public mode", job_id);
            self.inner.notifier.info("Sign in to save jobs");
            return Ok(None);
        }

        let saving = self.inner.saving.enter();
        self.inner.bump_favorites_generation();
        let server = self.server_ids();
        let (direction, previous) = {
            let mut state = lock(&self.inner.state);
            let was_saved = merged_saved(&server, &state.overlay).contains(&job_id);
            let previous = state.overlay.set(job_id.clone(), !was_saved);
            (SaveDirection::from_previous(was_saved), previous)
        };
        debug!("Optimistically marked {} as {:?}", job_id, direction);
        let pending = PendingSave {
            inner: &self.inner,
            job_id: job_id.clone(),
            previous,
            confirmed: false,
            _saving: saving,
        };

        match self.inner.api.save_job(&job_id).await {
            Ok(()) => {
                pending.confirm();
                if let Err(e) = self.fetch_favorites(true).await {
                    warn!("Saved {} but favorites refetch failed, keeping local state: {}", job_id, e);
                }
                info!("Job {} {:?}", job_id, direction);
                self.inner.notifier.success(direction.success_message());
                Ok(Some(direction))
            }
            Err(e) => {
                drop(pending);
                warn!("Rolled back save of {}: {}", job_id, e);
                self.inner
                    .notifier
                    .error(e.user_message().unwrap_or(SAVE_FAILED_FALLBACK));
                Err(e)
            }
        }
    }
}
