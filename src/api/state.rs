use std::sync::Arc;

use crate::bot::BotEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BotEngine>,
}

impl AppState {
    pub fn new(engine: BotEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
