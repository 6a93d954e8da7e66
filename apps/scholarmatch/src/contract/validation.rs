//! Input checks run by the operation contracts before any external call.

use url::Url;

use crate::contract::ResumeUpload;
use crate::errors::{OperationError, OperationResult};

pub const ALLOWED_RESUME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// 10 MiB.
pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

pub const MAX_PAGE_LIMIT: u32 = 100;

const SCHOLAR_HOST_PREFIX: &str = "scholar.google.";
const SCHOLAR_PATH: &str = "/citations";

pub fn validate_resume_upload(upload: &ResumeUpload) -> OperationResult<()> {
    let media_type = upload.media_type.trim().to_ascii_lowercase();
    if !ALLOWED_RESUME_TYPES.contains(&media_type.as_str()) {
        return Err(OperationError::validation(
            "Please upload a PDF or DOCX file",
        ));
    }

    if upload.size() > MAX_RESUME_BYTES {
        return Err(OperationError::validation(
            "File size must be less than 10MB",
        ));
    }

    Ok(())
}

/// Checks that `raw` points at a Google Scholar citations page and returns
/// the normalized URL. A missing scheme is read as https.
pub fn validate_profile_url(raw: &str) -> OperationResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OperationError::validation(
            "Please enter a Google Scholar profile URL",
        ));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let invalid = || OperationError::validation("Please enter a valid Google Scholar profile URL");

    let url = Url::parse(&candidate).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let is_scholar_host = host
        .strip_prefix(SCHOLAR_HOST_PREFIX)
        .is_some_and(is_google_tld);
    if !is_scholar_host {
        return Err(invalid());
    }

    if !url.path().starts_with(SCHOLAR_PATH) {
        return Err(invalid());
    }

    Ok(url)
}

/// `com`, a country code, or `co.<cc>` / `com.<cc>`.
fn is_google_tld(suffix: &str) -> bool {
    let is_country_code =
        |label: &str| label.len() == 2 && label.bytes().all(|b| b.is_ascii_lowercase());

    match suffix.split('.').collect::<Vec<_>>().as_slice() {
        ["com"] => true,
        [cc] => is_country_code(cc),
        ["co" | "com", cc] => is_country_code(cc),
        _ => false,
    }
}

pub fn validate_paging(page: u32, limit: u32) -> OperationResult<()> {
    if page == 0 {
        return Err(OperationError::validation("Page numbers start at 1"));
    }
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(OperationError::validation(format!(
            "Page size must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    Ok(())
}

/// Record ids are opaque but must be non-empty path-safe tokens.
pub fn validate_record_id(kind: &str, id: &str) -> OperationResult<()> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(OperationError::validation(format!("Invalid {kind} id '{id}'")))
    }
}
