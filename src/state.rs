use std::sync::Arc;

use crate::config::Config;
use crate::ingest::Pipeline;
use crate::store::EventStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn EventStore>,
    pub pipeline: Pipeline,
}
