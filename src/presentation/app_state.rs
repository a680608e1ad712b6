// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::transform_service::TransformService;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub transform_service: TransformService,
}
