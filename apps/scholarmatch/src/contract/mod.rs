//! Operation contracts: the named async calls every screen goes through.
//!
//! The external collaborators are capability traits (`ResumeExtractionService`,
//! `AcademicProfileService`, `SuggestionService`) so callers can inject mocks,
//! HTTP-backed clients or test fakes. `Services` wraps them and owns input
//! validation: a malformed input is rejected before the capability is
//! touched, and a response flagged `success: false` becomes a domain error.
//!
//! Contracts never mutate shared application state; they only return results.

pub mod http;
pub mod mock;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};
use url::Url;

use crate::errors::{OperationError, OperationResult};
use crate::models::profile::{ProfileFetchResponse, ProfileRecord};
use crate::models::project::{ProjectApplication, SuggestionQuery, SuggestionRecord, SuggestionsPage};
use crate::models::resume::{ResumePatch, ResumeRecord, ResumeUploadResponse};

use self::validation::{validate_paging, validate_profile_url, validate_record_id, validate_resume_upload};

/// A résumé document as handed over by the user.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl ResumeUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Capability traits
// ────────────────────────────────────────────────────────────────────────────

/// Turns an uploaded document into a structured résumé.
#[async_trait]
pub trait ResumeExtractionService: Send + Sync {
    async fn extract(&self, upload: ResumeUpload) -> OperationResult<ResumeUploadResponse>;

    async fn get_resume(&self, id: &str) -> OperationResult<ResumeRecord>;

    async fn update_resume(&self, id: &str, patch: ResumePatch) -> OperationResult<ResumeRecord>;
}

/// Looks up publication and citation metrics for an academic profile.
#[async_trait]
pub trait AcademicProfileService: Send + Sync {
    async fn fetch_profile(&self, profile_url: &Url) -> OperationResult<ProfileFetchResponse>;

    async fn get_profile(&self, id: &str) -> OperationResult<ProfileRecord>;

    async fn refresh_profile(&self, id: &str) -> OperationResult<ProfileRecord>;
}

/// Produces project suggestions and records user interactions with them.
#[async_trait]
pub trait SuggestionService: Send + Sync {
    async fn suggestions(&self, query: &SuggestionQuery) -> OperationResult<SuggestionsPage>;

    async fn get_project(&self, id: &str) -> OperationResult<SuggestionRecord>;

    async fn bookmark_project(&self, id: &str) -> OperationResult<()>;

    async fn apply_to_project(
        &self,
        id: &str,
        application: &ProjectApplication,
    ) -> OperationResult<()>;
}

// ────────────────────────────────────────────────────────────────────────────
// Validated operation contracts
// ────────────────────────────────────────────────────────────────────────────

/// The operation contracts, bound to injected capabilities.
/// Cheap to clone; constructed once at the application root.
#[derive(Clone)]
pub struct Services {
    resume: Arc<dyn ResumeExtractionService>,
    profile: Arc<dyn AcademicProfileService>,
    projects: Arc<dyn SuggestionService>,
}

impl Services {
    pub fn new(
        resume: Arc<dyn ResumeExtractionService>,
        profile: Arc<dyn AcademicProfileService>,
        projects: Arc<dyn SuggestionService>,
    ) -> Self {
        Self {
            resume,
            profile,
            projects,
        }
    }

    pub async fn upload_resume(&self, upload: ResumeUpload) -> OperationResult<ResumeUploadResponse> {
        validate_resume_upload(&upload)?;
        info!(
            "Uploading résumé '{}' ({} bytes, {})",
            upload.file_name,
            upload.size(),
            upload.media_type
        );

        let response = self.resume.extract(upload).await?;
        ensure_success(response.success, "Failed to process resume. Please try again.")?;
        debug!(
            "Résumé {} extracted in {:.1}s with {} skills",
            response.data.id,
            response.processing_time,
            response.data.skills.len()
        );
        Ok(response)
    }

    pub async fn get_resume(&self, id: &str) -> OperationResult<ResumeRecord> {
        validate_record_id("resume", id)?;
        self.resume.get_resume(id).await
    }

    pub async fn update_resume(&self, id: &str, patch: ResumePatch) -> OperationResult<ResumeRecord> {
        validate_record_id("resume", id)?;
        self.resume.update_resume(id, patch).await
    }

    pub async fn fetch_profile(&self, profile_url: &str) -> OperationResult<ProfileFetchResponse> {
        let url = validate_profile_url(profile_url)?;
        info!("Fetching academic profile {url}");

        let response = self.profile.fetch_profile(&url).await?;
        ensure_success(
            response.success,
            "Failed to fetch Google Scholar profile. Please check the URL and try again.",
        )?;
        debug!(
            "Profile {} fetched in {:.1}s: {} publications, {} citations",
            response.data.id,
            response.fetch_time,
            response.data.publications.len(),
            response.data.total_citations
        );
        Ok(response)
    }

    pub async fn get_profile(&self, id: &str) -> OperationResult<ProfileRecord> {
        validate_record_id("profile", id)?;
        self.profile.get_profile(id).await
    }

    pub async fn refresh_profile(&self, id: &str) -> OperationResult<ProfileRecord> {
        validate_record_id("profile", id)?;
        self.profile.refresh_profile(id).await
    }

    pub async fn get_suggestions(&self, query: SuggestionQuery) -> OperationResult<SuggestionsPage> {
        validate_paging(query.page, query.limit)?;
        if query.resume_id.is_none() && query.scholar_id.is_none() {
            // Allowed, but the matcher has nothing personal to rank against.
            debug!("Suggestions requested without a résumé or profile id");
        }

        let page = self.projects.suggestions(&query).await?;
        ensure_success(page.success, "Failed to load suggestions. Please try again.")?;
        debug!(
            "Suggestions page {}: {} of {} (has_more={})",
            page.page,
            page.data.len(),
            page.total,
            page.has_more
        );
        Ok(page)
    }

    pub async fn get_project(&self, id: &str) -> OperationResult<SuggestionRecord> {
        validate_record_id("project", id)?;
        self.projects.get_project(id).await
    }

    pub async fn bookmark_project(&self, id: &str) -> OperationResult<()> {
        validate_record_id("project", id)?;
        self.projects.bookmark_project(id).await
    }

    pub async fn apply_to_project(
        &self,
        id: &str,
        application: ProjectApplication,
    ) -> OperationResult<()> {
        validate_record_id("project", id)?;
        self.projects.apply_to_project(id, &application).await
    }
}

fn ensure_success(success: bool, message: &str) -> OperationResult<()> {
    if success {
        Ok(())
    } else {
        Err(OperationError::domain(message))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic fakes that count how often the capability was reached.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::contract::mock::{canned_profile, canned_resume};

    pub fn sample_resume(id: &str) -> ResumeRecord {
        let mut record = canned_resume().unwrap();
        record.id = id.to_string();
        record
    }

    pub fn sample_profile(id: &str, profile_url: &str) -> ProfileRecord {
        let mut record = canned_profile().unwrap();
        record.id = id.to_string();
        record.profile_url = profile_url.to_string();
        record
    }

    #[derive(Default)]
    pub struct CountingResumeService {
        pub calls: AtomicUsize,
        pub fail_with: Mutex<Option<OperationError>>,
        pub report_failure: bool,
    }

    impl CountingResumeService {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResumeExtractionService for CountingResumeService {
        async fn extract(&self, _upload: ResumeUpload) -> OperationResult<ResumeUploadResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let injected = self.fail_with.lock().unwrap().clone();
            if let Some(err) = injected {
                return Err(err);
            }
            Ok(ResumeUploadResponse {
                success: !self.report_failure,
                data: sample_resume("resume_fake"),
                processing_time: 0.0,
            })
        }

        async fn get_resume(&self, id: &str) -> OperationResult<ResumeRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_resume(id))
        }

        async fn update_resume(&self, id: &str, patch: ResumePatch) -> OperationResult<ResumeRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut record = sample_resume(id);
            record.apply(patch);
            Ok(record)
        }
    }

    #[derive(Default)]
    pub struct CountingProfileService {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl AcademicProfileService for CountingProfileService {
        async fn fetch_profile(&self, profile_url: &Url) -> OperationResult<ProfileFetchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProfileFetchResponse {
                success: true,
                data: sample_profile("scholar_fake", profile_url.as_str()),
                fetch_time: 0.0,
            })
        }

        async fn get_profile(&self, id: &str) -> OperationResult<ProfileRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_profile(id, "https://scholar.google.com/citations?user=fake"))
        }

        async fn refresh_profile(&self, id: &str) -> OperationResult<ProfileRecord> {
            self.get_profile(id).await
        }
    }

    #[derive(Default)]
    pub struct CountingSuggestionService {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl SuggestionService for CountingSuggestionService {
        async fn suggestions(&self, query: &SuggestionQuery) -> OperationResult<SuggestionsPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SuggestionsPage {
                success: true,
                data: vec![],
                total: 0,
                page: query.page,
                has_more: false,
                filters: Default::default(),
            })
        }

        async fn get_project(&self, id: &str) -> OperationResult<SuggestionRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(OperationError::domain(format!("Project {id} not found")))
        }

        async fn bookmark_project(&self, _id: &str) -> OperationResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn apply_to_project(
            &self,
            _id: &str,
            _application: &ProjectApplication,
        ) -> OperationResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::*;
    use super::*;

    struct Fakes {
        resume: Arc<CountingResumeService>,
        profile: Arc<CountingProfileService>,
        projects: Arc<CountingSuggestionService>,
    }

    impl Fakes {
        fn new(resume: CountingResumeService) -> Self {
            Self {
                resume: Arc::new(resume),
                profile: Arc::new(CountingProfileService::default()),
                projects: Arc::new(CountingSuggestionService::default()),
            }
        }

        fn services(&self) -> Services {
            Services::new(self.resume.clone(), self.profile.clone(), self.projects.clone())
        }
    }

    fn pdf(size: usize) -> ResumeUpload {
        ResumeUpload {
            file_name: "cv.pdf".to_string(),
            media_type: "application/pdf".to_string(),
            bytes: Bytes::from(vec![1u8; size]),
        }
    }

    #[tokio::test]
    async fn test_invalid_upload_never_reaches_the_service() {
        let fakes = Fakes::new(CountingResumeService::default());
        let services = fakes.services();

        let mut wrong_type = pdf(10);
        wrong_type.media_type = "text/plain".to_string();
        let oversized = pdf(validation::MAX_RESUME_BYTES + 1);

        for upload in [wrong_type, oversized] {
            let err = services.upload_resume(upload).await.unwrap_err();
            assert!(err.is_validation());
        }
        assert_eq!(fakes.resume.calls(), 0);
    }

    #[tokio::test]
    async fn test_valid_upload_reaches_the_service() {
        let fakes = Fakes::new(CountingResumeService::default());
        let response = fakes.services().upload_resume(pdf(2048)).await.unwrap();
        assert!(response.success);
        assert_eq!(fakes.resume.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsuccessful_response_is_a_domain_error() {
        let fakes = Fakes::new(CountingResumeService {
            report_failure: true,
            ..Default::default()
        });
        let err = fakes.services().upload_resume(pdf(10)).await.unwrap_err();
        assert!(err.is_domain());
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through_unchanged() {
        let fakes = Fakes::new(CountingResumeService {
            fail_with: std::sync::Mutex::new(Some(OperationError::network("Network error occurred"))),
            ..Default::default()
        });
        let err = fakes.services().upload_resume(pdf(10)).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Network error occurred");
    }

    #[tokio::test]
    async fn test_bad_profile_url_never_reaches_the_service() {
        let fakes = Fakes::new(CountingResumeService::default());
        let err = fakes
            .services()
            .fetch_profile("https://example.com/not-scholar")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(fakes.profile.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_paging_never_reaches_the_service() {
        let fakes = Fakes::new(CountingResumeService::default());
        let query = SuggestionQuery {
            limit: 0,
            ..Default::default()
        };
        assert!(fakes.services().get_suggestions(query).await.is_err());
        assert_eq!(fakes.projects.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_suggestions_without_ids_are_allowed() {
        let fakes = Fakes::new(CountingResumeService::default());
        let page = fakes
            .services()
            .get_suggestions(SuggestionQuery::default())
            .await
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(fakes.projects.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bookmark_rejects_unsafe_ids() {
        let fakes = Fakes::new(CountingResumeService::default());
        assert!(fakes.services().bookmark_project("a/b").await.is_err());
        assert!(fakes.services().bookmark_project("proj_1").await.is_ok());
        assert_eq!(fakes.projects.calls.load(Ordering::SeqCst), 1);
    }
}
