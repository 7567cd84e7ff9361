// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::native_filters::NativeFilterDebouncer;

pub struct AppState {
    pub dashboard_service: DashboardService,
    pub native_filters: NativeFilterDebouncer,
}
