use crate::context::ServiceContext;

/// Gateway application state (shared).
pub struct AppState {
    pub ctx: ServiceContext,
}

impl AppState {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }
}
