// Application state for HTTP handlers
use crate::application::dashboard_store::DashboardStore;

pub struct AppState {
    pub store: DashboardStore,
}
