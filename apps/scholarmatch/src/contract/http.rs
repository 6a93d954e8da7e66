//! HTTP-backed service implementations.
//!
//! `ApiClient` is the single point of entry for network calls made on behalf
//! of the operation contracts. Every failure is folded into `OperationError`:
//! no response at all is a transport error, 400 is a validation error echoed
//! by the server, 404/422 are domain errors, anything else non-2xx is a
//! transport error. No retries happen here.
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::contract::{AcademicProfileService, ResumeExtractionService, ResumeUpload, SuggestionService};
use crate::errors::{OperationError, OperationResult};
use crate::models::profile::{ProfileFetchRequest, ProfileFetchResponse, ProfileRecord};
use crate::models::project::{ProjectApplication, SuggestionQuery, SuggestionRecord, SuggestionsPage};
use crate::models::resume::{ResumePatch, ResumeRecord, ResumeUploadResponse};

const NETWORK_ERROR: &str = "Network error occurred";

/// Error body produced by the backend: `{"error": {"code", "message"}}`.
/// A flat `{"message"}` body is accepted too.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and turns any non-2xx answer into an `OperationError`.
    async fn send(&self, request: RequestBuilder) -> OperationResult<Response> {
        let response = request.send().await.map_err(|e| {
            warn!("Request failed before a response arrived: {e}");
            OperationError::network(NETWORK_ERROR)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        debug!("Backend answered {status}: {message}");
        Err(classify(status, message))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> OperationResult<T> {
        let response = self.send(request).await?;
        let status = response.status();
        response.json::<T>().await.map_err(|e| {
            warn!("Unreadable response body: {e}");
            OperationError::Transport {
                status: Some(status.as_u16()),
                message: "Invalid response from server".to_string(),
            }
        })
    }
}

fn error_message(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope.error.map(|e| e.message).or(envelope.message)
}

fn classify(status: StatusCode, message: String) -> OperationError {
    match status {
        StatusCode::BAD_REQUEST => OperationError::Validation(message),
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => OperationError::Domain(message),
        _ => OperationError::Transport {
            status: Some(status.as_u16()),
            message,
        },
    }
}

#[async_trait]
impl ResumeExtractionService for ApiClient {
    async fn extract(&self, upload: ResumeUpload) -> OperationResult<ResumeUploadResponse> {
        let part = multipart::Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name)
            .mime_str(&upload.media_type)
            .map_err(|_| {
                OperationError::validation(format!("Unsupported media type '{}'", upload.media_type))
            })?;
        let form = multipart::Form::new().part("file", part);

        self.send_json(self.client.post(self.url("/resume/upload")).multipart(form))
            .await
    }

    async fn get_resume(&self, id: &str) -> OperationResult<ResumeRecord> {
        self.send_json(self.client.get(self.url(&format!("/resume/{id}"))))
            .await
    }

    async fn update_resume(&self, id: &str, patch: ResumePatch) -> OperationResult<ResumeRecord> {
        self.send_json(self.client.put(self.url(&format!("/resume/{id}"))).json(&patch))
            .await
    }
}

#[async_trait]
impl AcademicProfileService for ApiClient {
    async fn fetch_profile(&self, profile_url: &Url) -> OperationResult<ProfileFetchResponse> {
        let body = ProfileFetchRequest {
            profile_url: profile_url.to_string(),
        };
        self.send_json(self.client.post(self.url("/scholar/fetch")).json(&body))
            .await
    }

    async fn get_profile(&self, id: &str) -> OperationResult<ProfileRecord> {
        self.send_json(self.client.get(self.url(&format!("/scholar/{id}"))))
            .await
    }

    async fn refresh_profile(&self, id: &str) -> OperationResult<ProfileRecord> {
        self.send_json(self.client.post(self.url(&format!("/scholar/{id}/refresh"))))
            .await
    }
}

#[async_trait]
impl SuggestionService for ApiClient {
    async fn suggestions(&self, query: &SuggestionQuery) -> OperationResult<SuggestionsPage> {
        self.send_json(self.client.post(self.url("/projects/suggestions")).json(query))
            .await
    }

    async fn get_project(&self, id: &str) -> OperationResult<SuggestionRecord> {
        self.send_json(self.client.get(self.url(&format!("/projects/{id}"))))
            .await
    }

    async fn bookmark_project(&self, id: &str) -> OperationResult<()> {
        self.send(self.client.post(self.url(&format!("/projects/{id}/bookmark"))))
            .await?;
        Ok(())
    }

    async fn apply_to_project(
        &self,
        id: &str,
        application: &ProjectApplication,
    ) -> OperationResult<()> {
        self.send(
            self.client
                .post(self.url(&format!("/projects/{id}/apply")))
                .json(application),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::contract::mock::{mock_services, MockLatencies};
    use crate::contract::Services;
    use crate::models::project::{Difficulty, SuggestionFilters};
    use crate::routes::build_router;
    use crate::state::AppState;

    async fn spawn_backend() -> ApiClient {
        let state = AppState {
            services: mock_services(MockLatencies::INSTANT).unwrap(),
            config: Config::default(),
        };
        let app = build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ApiClient::new(format!("http://{addr}/api/"), Duration::from_secs(5)).unwrap()
    }

    fn client_services(client: ApiClient) -> Services {
        let client = Arc::new(client);
        Services::new(client.clone(), client.clone(), client)
    }

    fn pdf() -> ResumeUpload {
        ResumeUpload {
            file_name: "cv.pdf".to_string(),
            media_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.7 minimal"),
        }
    }

    #[test]
    fn test_error_message_reads_both_envelopes() {
        assert_eq!(
            error_message(r#"{"error":{"code":"NOT_FOUND","message":"Project x not found"}}"#),
            Some("Project x not found".to_string())
        );
        assert_eq!(
            error_message(r#"{"message":"flat"}"#),
            Some("flat".to_string())
        );
        assert_eq!(error_message("<html>oops</html>"), None);
    }

    #[test]
    fn test_from_config_trims_base_url() {
        let config = Config {
            api_base_url: "http://localhost:3000/api/".to_string(),
            ..Config::default()
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.url("/projects/proj_1"), "http://localhost:3000/api/projects/proj_1");
    }

    #[test]
    fn test_classify_by_status() {
        assert!(classify(StatusCode::BAD_REQUEST, "m".into()).is_validation());
        assert!(classify(StatusCode::NOT_FOUND, "m".into()).is_domain());
        assert!(classify(StatusCode::UNPROCESSABLE_ENTITY, "m".into()).is_domain());
        assert_eq!(
            classify(StatusCode::SERVICE_UNAVAILABLE, "m".into()),
            OperationError::Transport {
                status: Some(503),
                message: "m".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_upload_then_fetch_resume_over_http() {
        let services = client_services(spawn_backend().await);

        let uploaded = services.upload_resume(pdf()).await.unwrap();
        let fetched = services.get_resume(&uploaded.data.id).await.unwrap();

        assert_eq!(fetched, uploaded.data);
    }

    #[tokio::test]
    async fn test_update_resume_over_http() {
        let services = client_services(spawn_backend().await);
        let uploaded = services.upload_resume(pdf()).await.unwrap();

        let updated = services
            .update_resume(
                &uploaded.data.id,
                ResumePatch {
                    name: Some("Dr. S. Johnson".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Dr. S. Johnson");
        assert_eq!(updated.email, uploaded.data.email);
    }

    #[tokio::test]
    async fn test_server_side_validation_surfaces_as_validation_error() {
        let client = spawn_backend().await;
        let mut upload = pdf();
        upload.media_type = "image/png".to_string();

        // Straight to the capability, skipping the local check.
        let err = client.extract(upload).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Please upload a PDF or DOCX file");
    }

    #[tokio::test]
    async fn test_profile_fetch_and_refresh_over_http() {
        let services = client_services(spawn_backend().await);

        let fetched = services
            .fetch_profile("https://scholar.google.com/citations?user=X")
            .await
            .unwrap();
        let refreshed = services.refresh_profile(&fetched.data.id).await.unwrap();

        assert_eq!(refreshed.id, fetched.data.id);
        assert_eq!(refreshed.total_citations, fetched.data.total_citations);
    }

    #[tokio::test]
    async fn test_filtered_suggestions_over_http() {
        let services = client_services(spawn_backend().await);
        let query = SuggestionQuery {
            filters: Some(SuggestionFilters {
                difficulty: Some(vec![Difficulty::Advanced]),
                ..Default::default()
            }),
            page: 1,
            limit: 1,
            ..Default::default()
        };

        let page = services.get_suggestions(query).await.unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].difficulty, Difficulty::Advanced);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_unknown_project_is_domain_error() {
        let services = client_services(spawn_backend().await);
        let err = services.get_project("proj_999").await.unwrap_err();
        assert!(err.is_domain());
        assert!(err.to_string().contains("proj_999"));
    }

    #[tokio::test]
    async fn test_bookmark_and_apply_over_http() {
        let services = client_services(spawn_backend().await);

        services.bookmark_project("proj_1").await.unwrap();
        assert!(services.get_project("proj_1").await.unwrap().is_bookmarked);

        services
            .apply_to_project("proj_1", ProjectApplication::default())
            .await
            .unwrap();
        let again = services
            .apply_to_project("proj_1", ProjectApplication::default())
            .await
            .unwrap_err();
        assert!(again.is_domain());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(format!("http://{addr}/api"), Duration::from_secs(2)).unwrap();
        let err = client.get_project("proj_1").await.unwrap_err();

        assert_eq!(err, OperationError::network(NETWORK_ERROR));
    }
}
