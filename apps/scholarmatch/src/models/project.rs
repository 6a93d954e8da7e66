use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollaborationType {
    Research,
    Industry,
    Academic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    NotApplied,
    Applied,
    UnderReview,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Catalog order, which is already ranked by the matcher.
    #[default]
    Relevance,
    /// Earliest deadline first; undated projects last.
    Date,
    /// Highest match score first.
    MatchScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// One suggested project with its precomputed match score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    pub skills_required: Vec<String>,
    #[serde(default)]
    pub skills_preferred: Vec<String>,
    pub matching_reason: String,
    pub match_score: u8,
    pub collaboration_type: CollaborationType,
    pub difficulty: Difficulty,
    pub duration: String,
    pub commitment: String,
    pub organization: Organization,
    pub contact: Contact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub is_bookmarked: bool,
    #[serde(default)]
    pub application_status: ApplicationStatus,
}

/// Narrowing filters for suggestions.
///
/// Every field is optional: an absent field (or an empty list) applies no
/// narrowing on that facet. List facets match when the record carries any of
/// the listed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration_type: Option<Vec<CollaborationType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Vec<Difficulty>>,
    /// Case-insensitive; matched against required and preferred skills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    /// Case-insensitive substring of the project duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Case-insensitive substring of the organization location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// `Some(true)` keeps only compensated projects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

impl SuggestionFilters {
    /// Shallow merge: every field present in `patch` replaces the current one.
    pub fn merge(&self, patch: SuggestionFilters) -> SuggestionFilters {
        SuggestionFilters {
            collaboration_type: patch
                .collaboration_type
                .or_else(|| self.collaboration_type.clone()),
            difficulty: patch.difficulty.or_else(|| self.difficulty.clone()),
            skills: patch.skills.or_else(|| self.skills.clone()),
            duration: patch.duration.or_else(|| self.duration.clone()),
            location: patch.location.or_else(|| self.location.clone()),
            compensation: patch.compensation.or(self.compensation),
            sort_by: patch.sort_by.or(self.sort_by),
        }
    }

    pub fn sort_order(&self) -> SortBy {
        self.sort_by.unwrap_or_default()
    }

    pub fn matches(&self, record: &SuggestionRecord) -> bool {
        if let Some(types) = non_empty(&self.collaboration_type) {
            if !types.contains(&record.collaboration_type) {
                return false;
            }
        }

        if let Some(levels) = non_empty(&self.difficulty) {
            if !levels.contains(&record.difficulty) {
                return false;
            }
        }

        if let Some(skills) = non_empty(&self.skills) {
            let wanted: Vec<String> = skills.iter().map(|s| s.to_lowercase()).collect();
            let hit = record
                .skills_required
                .iter()
                .chain(record.skills_preferred.iter())
                .any(|s| wanted.contains(&s.to_lowercase()));
            if !hit {
                return false;
            }
        }

        if let Some(duration) = non_blank(&self.duration) {
            if !contains_ignore_case(&record.duration, duration) {
                return false;
            }
        }

        if let Some(location) = non_blank(&self.location) {
            if !contains_ignore_case(&record.organization.location, location) {
                return false;
            }
        }

        if self.compensation == Some(true) && record.compensation.is_none() {
            return false;
        }

        true
    }
}

fn non_empty<T>(values: &Option<Vec<T>>) -> Option<&Vec<T>> {
    values.as_ref().filter(|v| !v.is_empty())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Input of the suggestions operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<SuggestionFilters>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for SuggestionQuery {
    fn default() -> Self {
        SuggestionQuery {
            resume_id: None,
            scholar_id: None,
            filters: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Values the presentation layer may offer as filter choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetCatalog {
    pub available_skills: Vec<String>,
    pub available_organizations: Vec<String>,
    pub available_locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsPage {
    pub success: bool,
    pub data: Vec<SuggestionRecord>,
    pub total: usize,
    pub page: u32,
    pub has_more: bool,
    pub filters: FacetCatalog,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectApplication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholar_id: Option<String>,
}
