// src/saved.rs
//! Saved-job bookkeeping: server favorites merged with local, unconfirmed
//! toggles. The merged set is always recomputed, never stored.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{FavoriteRecord, JobId};

/// Job ids the server reports as saved.
pub fn server_saved_ids(records: &[FavoriteRecord]) -> BTreeSet<JobId> {
    records.iter().map(|record| record.job_id.clone()).collect()
}

/// Server truth with the overlay applied on top.
pub fn merged_saved(server: &BTreeSet<JobId>, overlay: &OptimisticOverlay) -> BTreeSet<JobId> {
    let mut merged = server.clone();
    for (job_id, saved) in &overlay.entries {
        if *saved {
            merged.insert(job_id.clone());
        } else {
            merged.remove(job_id);
        }
    }
    merged
}

/// Locally toggled saved states not yet confirmed by a favorites refetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimisticOverlay {
    entries: BTreeMap<JobId, bool>,
}

impl OptimisticOverlay {
    /// Record `saved` for `job_id`, returning the entry it replaced so a
    /// failed request can put it back.
    pub fn set(&mut self, job_id: JobId, saved: bool) -> Option<bool> {
        self.entries.insert(job_id, saved)
    }

    pub fn restore(&mut self, job_id: &JobId, previous: Option<bool>) {
        match previous {
            Some(saved) => {
                self.entries.insert(job_id.clone(), saved);
            }
            None => {
                self.entries.remove(job_id);
            }
        }
    }

    pub fn get(&self, job_id: &JobId) -> Option<bool> {
        self.entries.get(job_id).copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Which way a save toggle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDirection {
    Saved,
    Removed,
}

impl SaveDirection {
    pub fn from_previous(was_saved: bool) -> Self {
        if was_saved {
            Self::Removed
        } else {
            Self::Saved
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Self::Saved => "Job saved",
            Self::Removed => "Job removed from saved jobs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(values: &[&str]) -> BTreeSet<JobId> {
        values.iter().map(|v| JobId::from(*v)).collect()
    }

    #[test]
    fn test_empty_overlay_is_server_truth() {
        let server = ids(&["job-1", "job-2"]);
        assert_eq!(merged_saved(&server, &OptimisticOverlay::default()), server);
    }

    #[test]
    fn test_overlay_adds_and_removes() {
        let server = ids(&["job-1", "job-2"]);
        let mut overlay = OptimisticOverlay::default();
        overlay.set("job-42".into(), true);
        overlay.set("job-1".into(), false);

        assert_eq!(merged_saved(&server, &overlay), ids(&["job-2", "job-42"]));
    }

    #[test]
    fn test_restore_returns_to_pre_toggle_state() {
        let server = ids(&[]);
        let mut overlay = OptimisticOverlay::default();

        let previous = overlay.set("job-42".into(), true);
        assert!(merged_saved(&server, &overlay).contains(&JobId::from("job-42")));

        overlay.restore(&"job-42".into(), previous);
        assert!(overlay.is_empty());
        assert!(!merged_saved(&server, &overlay).contains(&JobId::from("job-42")));
    }

    #[test]
    fn test_restore_keeps_earlier_toggle() {
        let mut overlay = OptimisticOverlay::default();
        overlay.set("job-7".into(), true);
        let previous = overlay.set("job-7".into(), false);

        overlay.restore(&"job-7".into(), previous);
        assert_eq!(overlay.get(&"job-7".into()), Some(true));
    }

    #[test]
    fn test_server_saved_ids() {
        let records = vec![FavoriteRecord::new("job-3"), FavoriteRecord::new("job-1")];
        assert_eq!(server_saved_ids(&records), ids(&["job-1", "job-3"]));
    }

    #[test]
    fn test_direction_messages() {
        assert_eq!(SaveDirection::from_previous(false), SaveDirection::Saved);
        assert_eq!(SaveDirection::from_previous(true), SaveDirection::Removed);
        assert_eq!(SaveDirection::Saved.success_message(), "Job saved");
    }
}
