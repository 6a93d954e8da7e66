use crate::config::Config;
use crate::contract::Services;

/// Shared state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Validated operation contracts. The backend binary wires the mocks in.
    pub services: Services,
    pub config: Config,
}
