use std::sync::Arc;

use crate::monitor::Monitor;
use crate::personalization::Personalization;

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub personalization: Arc<Personalization>,
}
