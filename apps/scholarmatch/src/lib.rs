//! ScholarMatch orchestration layer.
//!
//! Operation contracts (`contract`) wrap the résumé, academic-profile and
//! suggestion services; `async_state` tracks one call's lifecycle; `store`
//! holds the session-wide results; `session` ties the three together. The
//! `routes` module serves the mock services over HTTP for the binary.

pub mod async_state;
pub mod config;
pub mod contract;
pub mod errors;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;

pub use async_state::{AsyncOperation, AsyncState, Completion};
pub use contract::{ResumeUpload, Services};
pub use errors::{OperationError, OperationResult};
pub use session::Session;
pub use store::{Action, ApplicationState, Store};
