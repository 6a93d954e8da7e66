//! Global application state for one session.
//!
//! State only changes through `Action`s folded by the pure `reduce`. `Store`
//! owns the current value, is built once at the application root and handed
//! to every consumer explicitly. Per-slot tickets let callers drop results
//! that arrive after a newer request for the same slot was issued.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::profile::ProfileRecord;
use crate::models::project::SuggestionRecord;
use crate::models::resume::ResumeRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    pub resume: Option<ResumeRecord>,
    pub profile: Option<ProfileRecord>,
    pub suggestions: Vec<SuggestionRecord>,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ReplaceResume(ResumeRecord),
    ReplaceProfile(ProfileRecord),
    ReplaceSuggestions(Vec<SuggestionRecord>),
    SetLoading(bool),
    /// Also ends any global loading indicator.
    SetError(String),
    ClearError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Resume,
    Profile,
    Suggestions,
}

impl Slot {
    const ALL: [Slot; 3] = [Slot::Resume, Slot::Profile, Slot::Suggestions];

    fn index(self) -> usize {
        match self {
            Slot::Resume => 0,
            Slot::Profile => 1,
            Slot::Suggestions => 2,
        }
    }
}

impl Action {
    /// The data slot this action replaces, if any.
    pub fn slot(&self) -> Option<Slot> {
        match self {
            Action::ReplaceResume(_) => Some(Slot::Resume),
            Action::ReplaceProfile(_) => Some(Slot::Profile),
            Action::ReplaceSuggestions(_) => Some(Slot::Suggestions),
            Action::SetLoading(_) | Action::SetError(_) | Action::ClearError => None,
        }
    }
}

pub fn reduce(state: ApplicationState, action: Action) -> ApplicationState {
    match action {
        Action::ReplaceResume(resume) => ApplicationState {
            resume: Some(resume),
            ..state
        },
        Action::ReplaceProfile(profile) => ApplicationState {
            profile: Some(profile),
            ..state
        },
        Action::ReplaceSuggestions(suggestions) => ApplicationState {
            suggestions,
            ..state
        },
        Action::SetLoading(loading) => ApplicationState { loading, ..state },
        Action::SetError(message) => ApplicationState {
            last_error: Some(message),
            loading: false,
            ..state
        },
        Action::ClearError => ApplicationState {
            last_error: None,
            ..state
        },
    }
}

/// Proof that a request for `slot` was issued; see [`Store::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    slot: Slot,
    token: u64,
}

impl Ticket {
    pub fn slot(&self) -> Slot {
        self.slot
    }
}

pub struct Store {
    state: watch::Sender<ApplicationState>,
    tokens: [AtomicU64; 3],
}

impl Default for Store {
    fn default() -> Self {
        Self::new(ApplicationState::default())
    }
}

impl Store {
    pub fn new(initial: ApplicationState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            tokens: Slot::ALL.map(|_| AtomicU64::new(0)),
        }
    }

    /// Applies `action` unconditionally; the last write to a slot wins.
    pub fn dispatch(&self, action: Action) {
        debug!("dispatch {:?}", action_name(&action));
        self.state.send_modify(|state| {
            *state = reduce(std::mem::take(state), action);
        });
    }

    /// Starts a request for `slot`, retiring every ticket issued before.
    pub fn issue(&self, slot: Slot) -> Ticket {
        let token = self.tokens[slot.index()].fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { slot, token }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.tokens[ticket.slot.index()].load(Ordering::SeqCst) == ticket.token
    }

    /// Dispatches `action` only if `ticket` is still the latest for its slot.
    /// Returns whether the action was applied.
    pub fn commit(&self, ticket: Ticket, action: Action) -> bool {
        if let Some(slot) = action.slot() {
            if slot != ticket.slot {
                warn!(
                    "refusing {} with a ticket for {:?}",
                    action_name(&action),
                    ticket.slot
                );
                return false;
            }
        }
        if !self.is_current(ticket) {
            debug!(
                "dropping stale {} for {:?}",
                action_name(&action),
                ticket.slot
            );
            return false;
        }
        self.dispatch(action);
        true
    }

    pub fn snapshot(&self) -> ApplicationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ApplicationState> {
        self.state.subscribe()
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::ReplaceResume(_) => "replace-resume",
        Action::ReplaceProfile(_) => "replace-profile",
        Action::ReplaceSuggestions(_) => "replace-suggestions",
        Action::SetLoading(_) => "set-loading",
        Action::SetError(_) => "set-error",
        Action::ClearError => "clear-error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::mock::{canned_profile, canned_projects, canned_resume};

    fn resume(id: &str) -> ResumeRecord {
        let mut record = canned_resume().unwrap();
        record.id = id.to_string();
        record
    }

    #[test]
    fn test_replace_resume_populates_slot() {
        let state = reduce(ApplicationState::default(), Action::ReplaceResume(resume("r1")));
        assert_eq!(state.resume.unwrap().id, "r1");
        assert!(state.profile.is_none());
    }

    #[test]
    fn test_repopulating_replaces_without_merge() {
        let state = reduce(ApplicationState::default(), Action::ReplaceResume(resume("r1")));
        let mut second = resume("r2");
        second.skills = vec!["Rust".to_string()];
        let state = reduce(state, Action::ReplaceResume(second.clone()));
        assert_eq!(state.resume, Some(second));
    }

    #[test]
    fn test_error_does_not_clear_other_slots() {
        let state = reduce(
            ApplicationState::default(),
            Action::ReplaceProfile(canned_profile().unwrap()),
        );
        let state = reduce(state, Action::SetError("Upload failed".to_string()));
        assert!(state.profile.is_some());
        assert_eq!(state.last_error.as_deref(), Some("Upload failed"));
    }

    #[test]
    fn test_set_error_stops_loading_and_clear_error_keeps_it() {
        let state = reduce(ApplicationState::default(), Action::SetLoading(true));
        let state = reduce(state, Action::SetError("boom".to_string()));
        assert!(!state.loading);

        let state = reduce(state, Action::SetLoading(true));
        let state = reduce(state, Action::ClearError);
        assert!(state.loading);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_error_transitions_are_repeatable() {
        let mut state = ApplicationState::default();
        for round in 0..3 {
            state = reduce(state, Action::SetError(format!("error {round}")));
            assert!(state.last_error.is_some());
            state = reduce(state, Action::ClearError);
            assert!(state.last_error.is_none());
        }
    }

    #[test]
    fn test_suggestions_replaced_wholesale() {
        let projects = canned_projects().unwrap();
        let state = reduce(
            ApplicationState::default(),
            Action::ReplaceSuggestions(projects.clone()),
        );
        let state = reduce(state, Action::ReplaceSuggestions(projects[..1].to_vec()));
        assert_eq!(state.suggestions.len(), 1);
    }

    #[test]
    fn test_store_dispatch_and_snapshot() {
        let store = Store::default();
        let mut rx = store.subscribe();
        store.dispatch(Action::SetError("x".to_string()));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().last_error.as_deref(), Some("x"));
        store.dispatch(Action::ClearError);
        assert_eq!(store.snapshot(), ApplicationState::default());
    }

    #[test]
    fn test_stale_ticket_is_dropped() {
        let store = Store::default();
        let first = store.issue(Slot::Resume);
        let second = store.issue(Slot::Resume);

        assert!(store.commit(second, Action::ReplaceResume(resume("new"))));
        assert!(!store.commit(first, Action::ReplaceResume(resume("old"))));

        assert_eq!(store.snapshot().resume.unwrap().id, "new");
    }

    #[test]
    fn test_tickets_are_per_slot() {
        let store = Store::default();
        let resume_ticket = store.issue(Slot::Resume);
        let _profile_ticket = store.issue(Slot::Profile);
        assert!(store.is_current(resume_ticket));
    }

    #[test]
    fn test_ticket_for_wrong_slot_is_refused() {
        let store = Store::default();
        let ticket = store.issue(Slot::Profile);
        assert!(!store.commit(ticket, Action::ReplaceResume(resume("r1"))));
        assert!(store.snapshot().resume.is_none());
    }

    #[test]
    fn test_ticketed_error_applies_only_when_current() {
        let store = Store::default();
        let old = store.issue(Slot::Suggestions);
        let _new = store.issue(Slot::Suggestions);
        assert!(!store.commit(old, Action::SetError("stale".to_string())));
        assert!(store.snapshot().last_error.is_none());
    }
}
