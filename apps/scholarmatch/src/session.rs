//! One user's workflow: upload a résumé, link a profile, browse suggestions.
//!
//! `Session` wires the operation contracts to their async state containers
//! and feeds successful results into the shared `Store`. Every store write
//! goes through a slot ticket taken before the call started, so overlapping
//! requests for the same slot land in issue order. While a slotted request
//! is in flight the store's global `loading` flag is raised.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::async_state::{AsyncOperation, Completion};
use crate::contract::{ResumeUpload, Services};
use crate::errors::OperationError;
use crate::models::profile::ProfileFetchResponse;
use crate::models::project::{
    ProjectApplication, SuggestionFilters, SuggestionQuery, SuggestionsPage, DEFAULT_LIMIT,
    DEFAULT_PAGE,
};
use crate::models::resume::ResumeUploadResponse;
use crate::store::{Action, Slot, Store, Ticket};

/// Filter and paging state of the suggestions screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Browse {
    pub filters: SuggestionFilters,
    pub page: u32,
    pub limit: u32,
}

impl Default for Browse {
    fn default() -> Self {
        Browse {
            filters: SuggestionFilters::default(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

pub struct Session {
    services: Services,
    store: Arc<Store>,
    pub resume: AsyncOperation<ResumeUpload, ResumeUploadResponse>,
    pub profile: AsyncOperation<String, ProfileFetchResponse>,
    pub suggestions: AsyncOperation<SuggestionQuery, SuggestionsPage>,
    browse: Mutex<Browse>,
}

impl Session {
    pub fn new(services: Services, store: Arc<Store>) -> Self {
        let resume = {
            let services = services.clone();
            AsyncOperation::new("upload-resume", move |upload: ResumeUpload| {
                let services = services.clone();
                async move { services.upload_resume(upload).await }
            })
        };
        let profile = {
            let services = services.clone();
            AsyncOperation::new("fetch-profile", move |url: String| {
                let services = services.clone();
                async move { services.fetch_profile(&url).await }
            })
        };
        let suggestions = {
            let services = services.clone();
            AsyncOperation::new("get-suggestions", move |query: SuggestionQuery| {
                let services = services.clone();
                async move { services.get_suggestions(query).await }
            })
        };

        Self {
            services,
            store,
            resume,
            profile,
            suggestions,
            browse: Mutex::new(Browse::default()),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub async fn browse(&self) -> Browse {
        self.browse.lock().await.clone()
    }

    pub async fn upload_resume(&self, upload: ResumeUpload) -> Completion<ResumeUploadResponse> {
        let ticket = self.begin(Slot::Resume);
        let completion = self.resume.execute(upload).await;
        self.apply_completion(ticket, &completion, |response| {
            Action::ReplaceResume(response.data.clone())
        });
        completion
    }

    pub async fn link_profile(&self, profile_url: &str) -> Completion<ProfileFetchResponse> {
        let ticket = self.begin(Slot::Profile);
        let completion = self.profile.execute(profile_url.to_string()).await;
        self.apply_completion(ticket, &completion, |response| {
            Action::ReplaceProfile(response.data.clone())
        });
        completion
    }

    /// Re-reads the linked profile. This is a no-op without a linked profile
    /// or while a new profile is still being linked.
    pub async fn refresh_profile(&self) -> Option<Completion<()>> {
        if self.profile.snapshot().loading {
            debug!("Profile link in flight, skipping refresh");
            return None;
        }
        let id = self.store.snapshot().profile?.id;
        let ticket = self.begin(Slot::Profile);
        let completion = match self.services.refresh_profile(&id).await {
            Ok(record) => {
                if self.store.commit(ticket, Action::ReplaceProfile(record)) {
                    self.store.dispatch(Action::SetLoading(false));
                }
                Completion::Succeeded(())
            }
            Err(err) => self.fail(ticket, err),
        };
        Some(completion)
    }

    /// Fetches the current page with the current filters for whatever
    /// résumé and profile are linked.
    pub async fn load_suggestions(&self) -> Completion<SuggestionsPage> {
        let query = {
            let browse = self.browse.lock().await;
            let state = self.store.snapshot();
            SuggestionQuery {
                resume_id: state.resume.map(|r| r.id),
                scholar_id: state.profile.map(|p| p.id),
                filters: Some(browse.filters.clone()),
                page: browse.page,
                limit: browse.limit,
            }
        };
        debug!("Loading suggestions page {}", query.page);

        let ticket = self.begin(Slot::Suggestions);
        let completion = self.suggestions.execute(query).await;
        self.apply_completion(ticket, &completion, |page| {
            Action::ReplaceSuggestions(page.data.clone())
        });
        completion
    }

    /// Shallow-merges `patch` into the filters, returns to the first page
    /// and reloads.
    pub async fn change_filters(&self, patch: SuggestionFilters) -> Completion<SuggestionsPage> {
        {
            let mut browse = self.browse.lock().await;
            browse.filters = browse.filters.merge(patch);
            browse.page = DEFAULT_PAGE;
        }
        self.load_suggestions().await
    }

    pub async fn clear_filters(&self) -> Completion<SuggestionsPage> {
        {
            let mut browse = self.browse.lock().await;
            browse.filters = SuggestionFilters::default();
            browse.page = DEFAULT_PAGE;
        }
        self.load_suggestions().await
    }

    pub async fn set_page_size(&self, limit: u32) {
        let mut browse = self.browse.lock().await;
        browse.limit = limit;
        browse.page = DEFAULT_PAGE;
    }

    pub async fn refresh_suggestions(&self) -> Completion<SuggestionsPage> {
        self.browse.lock().await.page = DEFAULT_PAGE;
        self.load_suggestions().await
    }

    /// Moves to the next page when the last loaded page said there is one.
    /// A failed load leaves the current page in place.
    pub async fn next_page(&self) -> Option<Completion<SuggestionsPage>> {
        let has_more = self
            .suggestions
            .snapshot()
            .data
            .map(|page| page.has_more)
            .unwrap_or(false);
        if !has_more {
            return None;
        }
        let (current, next) = {
            let mut browse = self.browse.lock().await;
            let current = browse.page;
            browse.page += 1;
            (current, browse.page)
        };

        let completion = self.load_suggestions().await;
        if matches!(completion, Completion::Failed(_)) {
            let mut browse = self.browse.lock().await;
            if browse.page == next {
                browse.page = current;
            }
        }
        Some(completion)
    }

    pub async fn bookmark(&self, project_id: &str) -> Completion<()> {
        match self.services.bookmark_project(project_id).await {
            Ok(()) => {
                info!("Bookmark toggled for {project_id}");
                Completion::Succeeded(())
            }
            Err(err) => self.report(err),
        }
    }

    pub async fn apply_to_project(
        &self,
        project_id: &str,
        application: ProjectApplication,
    ) -> Completion<()> {
        match self
            .services
            .apply_to_project(project_id, application)
            .await
        {
            Ok(()) => Completion::Succeeded(()),
            Err(err) => self.report(err),
        }
    }

    pub fn dismiss_error(&self) {
        self.store.dispatch(Action::ClearError);
    }

    fn begin(&self, slot: Slot) -> Ticket {
        let ticket = self.store.issue(slot);
        self.store.dispatch(Action::SetLoading(true));
        ticket
    }

    fn apply_completion<T>(
        &self,
        ticket: Ticket,
        completion: &Completion<T>,
        to_action: impl FnOnce(&T) -> Action,
    ) {
        match completion {
            Completion::Succeeded(data) => {
                if self.store.commit(ticket, to_action(data)) {
                    self.store.dispatch(Action::SetLoading(false));
                }
            }
            Completion::Failed(message) => {
                self.store.commit(ticket, Action::SetError(message.clone()));
            }
            Completion::Superseded => {}
        }
    }

    /// Errors of unslotted calls always reach the store.
    fn report(&self, err: OperationError) -> Completion<()> {
        let message = err.to_string();
        self.store.dispatch(Action::SetError(message.clone()));
        Completion::Failed(message)
    }

    fn fail(&self, ticket: Ticket, err: OperationError) -> Completion<()> {
        let message = err.to_string();
        self.store.commit(ticket, Action::SetError(message.clone()));
        Completion::Failed(message)
    }
}
