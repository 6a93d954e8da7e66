use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Academic profile with publication and citation metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: String,
    pub profile_url: String,
    pub name: String,
    pub affiliation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub interests: Vec<String>,
    pub publications: Vec<Publication>,
    pub total_citations: u64,
    pub h_index: u32,
    pub i10_index: u32,
    #[serde(default)]
    pub coauthors: Vec<Coauthor>,
    #[serde(default)]
    pub recent_activity: Vec<Activity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub citations: u64,
    pub venue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coauthor {
    pub name: String,
    pub affiliation: String,
    pub collaborations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Publication,
    Citation,
    Collaboration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFetchResponse {
    pub success: bool,
    pub data: ProfileRecord,
    /// Seconds spent looking the profile up.
    pub fetch_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFetchRequest {
    pub profile_url: String,
}
