// src/filters.rs
//! Canonical filter tuple and its coupled transitions.
//!
//! Changing a location ancestor clears every descendant and sends the
//! page back to 1. Transitions return whether the tuple actually changed
//! so the caller only republishes real changes.

use crate::types::{ListJobsRequest, LocationId};
use crate::utils::normalize_search_term;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterTuple {
    pub search_term: String,
    pub page: u32,
    pub country: Option<LocationId>,
    pub state: Option<LocationId>,
    pub city: Option<LocationId>,
}

impl Default for FilterTuple {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            page: 1,
            country: None,
            state: None,
            city: None,
        }
    }
}

impl FilterTuple {
    /// Commit a settled search term. Unchanged terms leave the page alone.
    pub fn commit_search(&mut self, term: &str) -> bool {
        let term = normalize_search_term(term);
        if self.search_term == term {
            return false;
        }
        self.search_term = term;
        self.page = 1;
        true
    }

    pub fn set_country(&mut self, country: Option<LocationId>) -> bool {
        let before = self.clone();
        self.country = country;
        self.state = None;
        self.city = None;
        self.page = 1;
        *self != before
    }

    /// Ignored while no country is selected.
    pub fn set_state(&mut self, state: Option<LocationId>) -> bool {
        if state.is_some() && self.country.is_none() {
            return false;
        }
        let before = self.clone();
        self.state = state;
        self.city = None;
        self.page = 1;
        *self != before
    }

    /// Ignored while no state is selected.
    pub fn set_city(&mut self, city: Option<LocationId>) -> bool {
        if city.is_some() && self.state.is_none() {
            return false;
        }
        let before = self.clone();
        self.city = city;
        self.page = 1;
        *self != before
    }

    pub fn next_page(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    /// Build the list-jobs parameters for this tuple.
    pub fn to_request(&self, limit: u32) -> ListJobsRequest {
        let search = if self.search_term.is_empty() {
            None
        } else {
            Some(self.search_term.clone())
        };

        ListJobsRequest {
            page: self.page,
            limit,
            search,
            country: self.country.iter().cloned().collect(),
            state: self.state.iter().cloned().collect(),
            city: self.city.iter().cloned().collect(),
        }
    }

    /// Cascade invariant: no descendant without its ancestor, page ≥ 1.
    pub fn is_consistent(&self) -> bool {
        self.page >= 1
            && (self.country.is_some() || self.state.is_none())
            && (self.state.is_some() || self.city.is_none())
    }
}
