//! Canned service implementations with simulated latency.
//!
//! These stand in for the document-extraction, academic-profile and matching
//! backends. Records they hand out are kept in memory so follow-up lookups
//! (`get_resume`, `refresh_profile`, `bookmark_project`, ...) resolve; nothing
//! survives a restart. Only the most recent `MAX_KEPT_RECORDS` résumés and
//! profiles are kept, older ones resolve as unknown ids.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::contract::{
    AcademicProfileService, ResumeExtractionService, ResumeUpload, Services, SuggestionService,
};
use crate::errors::{OperationError, OperationResult};
use crate::models::profile::{ProfileFetchResponse, ProfileRecord};
use crate::models::project::{
    ApplicationStatus, FacetCatalog, ProjectApplication, SortBy, SuggestionQuery,
    SuggestionRecord, SuggestionsPage,
};
use crate::models::resume::{ResumePatch, ResumeRecord, ResumeUploadResponse};

const RESUME_FIXTURE: &str = include_str!("fixtures/resume.json");
const PROFILE_FIXTURE: &str = include_str!("fixtures/profile.json");
const PROJECTS_FIXTURE: &str = include_str!("fixtures/projects.json");

pub fn canned_resume() -> Result<ResumeRecord> {
    serde_json::from_str(RESUME_FIXTURE).context("résumé fixture is malformed")
}

pub fn canned_profile() -> Result<ProfileRecord> {
    serde_json::from_str(PROFILE_FIXTURE).context("profile fixture is malformed")
}

pub fn canned_projects() -> Result<Vec<SuggestionRecord>> {
    serde_json::from_str(PROJECTS_FIXTURE).context("project catalog fixture is malformed")
}

/// Artificial delay: `base` plus a uniformly random share of `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub base: Duration,
    pub jitter: Duration,
}

impl Latency {
    pub const NONE: Latency = Latency {
        base: Duration::ZERO,
        jitter: Duration::ZERO,
    };

    pub const fn millis(base: u64, jitter: u64) -> Self {
        Latency {
            base: Duration::from_millis(base),
            jitter: Duration::from_millis(jitter),
        }
    }

    fn sample(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base;
        }
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        self.base + Duration::from_millis(extra)
    }

    /// Sleeps for one sampled delay and returns the seconds that passed,
    /// rounded to one decimal.
    async fn wait(&self) -> f64 {
        let started = Instant::now();
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (started.elapsed().as_secs_f64() * 10.0).round() / 10.0
    }
}

/// Per-service delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockLatencies {
    pub resume: Latency,
    pub profile: Latency,
    pub suggestions: Latency,
}

impl MockLatencies {
    pub const REALISTIC: MockLatencies = MockLatencies {
        resume: Latency::millis(2000, 1000),
        profile: Latency::millis(1500, 1000),
        suggestions: Latency::millis(1000, 500),
    };

    pub const INSTANT: MockLatencies = MockLatencies {
        resume: Latency::NONE,
        profile: Latency::NONE,
        suggestions: Latency::NONE,
    };

    pub fn from_flag(simulate: bool) -> Self {
        if simulate {
            Self::REALISTIC
        } else {
            Self::INSTANT
        }
    }
}

/// Builds `Services` backed entirely by the mocks in this module.
pub fn mock_services(latencies: MockLatencies) -> Result<Services> {
    Ok(Services::new(
        Arc::new(MockResumeService::new(latencies.resume)?),
        Arc::new(MockProfileService::new(latencies.profile)?),
        Arc::new(MockSuggestionService::new(latencies.suggestions)?),
    ))
}

fn not_found(kind: &str, id: &str) -> OperationError {
    OperationError::domain(format!("{kind} {id} not found"))
}

pub const MAX_KEPT_RECORDS: usize = 256;

/// Id-keyed records that evict the oldest insert past `capacity`.
struct RecentRecords<T> {
    capacity: usize,
    by_id: HashMap<String, T>,
    order: VecDeque<String>,
}

impl<T> RecentRecords<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            by_id: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn insert(&mut self, id: String, record: T) {
        if self.by_id.insert(id.clone(), record).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.by_id.remove(&oldest);
            }
        }
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.by_id.get_mut(id)
    }

    fn contains_key(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Résumé extraction
// ────────────────────────────────────────────────────────────────────────────

pub struct MockResumeService {
    template: ResumeRecord,
    latency: Latency,
    records: RwLock<RecentRecords<ResumeRecord>>,
}

impl MockResumeService {
    pub fn new(latency: Latency) -> Result<Self> {
        Ok(Self {
            template: canned_resume()?,
            latency,
            records: RwLock::new(RecentRecords::new(MAX_KEPT_RECORDS)),
        })
    }
}

#[async_trait]
impl ResumeExtractionService for MockResumeService {
    async fn extract(&self, upload: ResumeUpload) -> OperationResult<ResumeUploadResponse> {
        let processing_time = self.latency.wait().await;

        let mut record = self.template.clone();
        record.id = format!("resume_{}", Uuid::new_v4().simple());
        debug!(
            "Mock extraction of '{}' produced {}",
            upload.file_name, record.id
        );

        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());

        Ok(ResumeUploadResponse {
            success: true,
            data: record,
            processing_time,
        })
    }

    async fn get_resume(&self, id: &str) -> OperationResult<ResumeRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("Resume", id))
    }

    async fn update_resume(&self, id: &str, patch: ResumePatch) -> OperationResult<ResumeRecord> {
        let mut records = self.records.write().await;
        let record = records.get_mut(id).ok_or_else(|| not_found("Resume", id))?;
        record.apply(patch);
        Ok(record.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Academic profile lookup
// ────────────────────────────────────────────────────────────────────────────

pub struct MockProfileService {
    template: ProfileRecord,
    latency: Latency,
    records: RwLock<RecentRecords<ProfileRecord>>,
}

impl MockProfileService {
    pub fn new(latency: Latency) -> Result<Self> {
        Ok(Self {
            template: canned_profile()?,
            latency,
            records: RwLock::new(RecentRecords::new(MAX_KEPT_RECORDS)),
        })
    }
}

#[async_trait]
impl AcademicProfileService for MockProfileService {
    async fn fetch_profile(&self, profile_url: &Url) -> OperationResult<ProfileFetchResponse> {
        let fetch_time = self.latency.wait().await;

        let mut record = self.template.clone();
        record.id = format!("scholar_{}", Uuid::new_v4().simple());
        record.profile_url = profile_url.to_string();

        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());

        Ok(ProfileFetchResponse {
            success: true,
            data: record,
            fetch_time,
        })
    }

    async fn get_profile(&self, id: &str) -> OperationResult<ProfileRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("Profile", id))
    }

    async fn refresh_profile(&self, id: &str) -> OperationResult<ProfileRecord> {
        if !self.records.read().await.contains_key(id) {
            return Err(not_found("Profile", id));
        }
        self.latency.wait().await;
        self.get_profile(id).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Project suggestions
// ────────────────────────────────────────────────────────────────────────────

pub struct MockSuggestionService {
    catalog: RwLock<Vec<SuggestionRecord>>,
    latency: Latency,
}

impl MockSuggestionService {
    pub fn new(latency: Latency) -> Result<Self> {
        Ok(Self::with_catalog(canned_projects()?, latency))
    }

    pub fn with_catalog(catalog: Vec<SuggestionRecord>, latency: Latency) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            latency,
        }
    }
}

#[async_trait]
impl SuggestionService for MockSuggestionService {
    async fn suggestions(&self, query: &SuggestionQuery) -> OperationResult<SuggestionsPage> {
        self.latency.wait().await;

        let catalog = self.catalog.read().await;
        let filters = query.filters.clone().unwrap_or_default();

        let mut matching: Vec<SuggestionRecord> = catalog
            .iter()
            .filter(|record| filters.matches(record))
            .cloned()
            .collect();
        sort_suggestions(&mut matching, filters.sort_order());

        let (data, total, has_more) = paginate(matching, query.page, query.limit);

        Ok(SuggestionsPage {
            success: true,
            data,
            total,
            page: query.page,
            has_more,
            filters: facets(&catalog),
        })
    }

    async fn get_project(&self, id: &str) -> OperationResult<SuggestionRecord> {
        self.catalog
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found("Project", id))
    }

    async fn bookmark_project(&self, id: &str) -> OperationResult<()> {
        let mut catalog = self.catalog.write().await;
        let project = catalog
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("Project", id))?;
        project.is_bookmarked = !project.is_bookmarked;
        debug!("Project {id} bookmarked={}", project.is_bookmarked);
        Ok(())
    }

    async fn apply_to_project(
        &self,
        id: &str,
        _application: &ProjectApplication,
    ) -> OperationResult<()> {
        let mut catalog = self.catalog.write().await;
        let project = catalog
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("Project", id))?;
        if project.application_status != ApplicationStatus::NotApplied {
            return Err(OperationError::domain(format!(
                "You have already applied to {}",
                project.title
            )));
        }
        project.application_status = ApplicationStatus::Applied;
        Ok(())
    }
}

fn sort_suggestions(records: &mut [SuggestionRecord], order: SortBy) {
    match order {
        SortBy::Relevance => {}
        SortBy::MatchScore => records.sort_by(|a, b| b.match_score.cmp(&a.match_score)),
        SortBy::Date => records.sort_by(|a, b| match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }),
    }
}

/// 1-based paging. Returns the page slice, the unpaged total and whether
/// anything follows the slice.
fn paginate(
    records: Vec<SuggestionRecord>,
    page: u32,
    limit: u32,
) -> (Vec<SuggestionRecord>, usize, bool) {
    let total = records.len();
    let limit = limit as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(limit);
    let has_more = start.saturating_add(limit) < total;
    let data = records.into_iter().skip(start).take(limit).collect();
    (data, total, has_more)
}

fn facets(catalog: &[SuggestionRecord]) -> FacetCatalog {
    let mut skills = BTreeSet::new();
    let mut organizations = BTreeSet::new();
    let mut locations = BTreeSet::new();

    for record in catalog {
        skills.extend(record.skills_required.iter().cloned());
        skills.extend(record.skills_preferred.iter().cloned());
        organizations.insert(record.organization.name.clone());
        locations.insert(record.organization.location.clone());
    }

    FacetCatalog {
        available_skills: skills.into_iter().collect(),
        available_organizations: organizations.into_iter().collect(),
        available_locations: locations.into_iter().collect(),
    }
}
