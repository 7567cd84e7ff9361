// Presentation layer - HTTP routes and handlers
pub mod app_state;
pub mod error_response;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/widgets/compile", post(compile_widget))
        .route("/widgets/defaults", post(default_widget))
        .route("/widgets/retype", post(retype_widget))
        .route("/widgets/line-labels", post(toggle_line_labels))
        .route("/layout/pack", post(pack_layout))
        .route("/dashboards/:id", get(get_dashboard))
        .route("/dashboards/:id/inspect", get(inspect_dashboard))
        .route("/dashboards/:id/reorder", post(reorder_sections))
        .route("/dashboards/:id/native-filters", put(update_native_filters))
        .route("/dashboards/:id/sections", post(add_section))
        .route("/dashboards/:id/sections/:section_id", delete(remove_section))
        .route(
            "/dashboards/:id/sections/:section_id/columns",
            put(set_section_columns),
        )
        .route(
            "/dashboards/:id/sections/:section_id/reorder",
            post(reorder_widgets),
        )
        .route(
            "/dashboards/:id/sections/:section_id/widgets",
            put(save_widget),
        )
        .route(
            "/dashboards/:id/sections/:section_id/widgets/:widget_id",
            delete(delete_widget),
        )
        .route(
            "/dashboards/:id/sections/:section_id/widgets/:widget_id/resize",
            post(resize_widget),
        )
        .with_state(state)
}
