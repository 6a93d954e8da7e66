pub mod profile;
pub mod project;
pub mod resume;

pub use profile::{ProfileFetchResponse, ProfileRecord};
pub use project::{SuggestionFilters, SuggestionQuery, SuggestionRecord, SuggestionsPage};
pub use resume::{ResumeRecord, ResumeUploadResponse};
