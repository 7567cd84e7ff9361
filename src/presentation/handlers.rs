// HTTP request handlers
use crate::application::dashboard_service::{
    CompileReport, CompiledWidget, PointerDrag, WidgetSubmission, compile,
};
use crate::application::errors::ServiceError;
use crate::domain::dashboard::{Dashboard, Widget};
use crate::domain::draft::{WidgetDraft, default_draft_for};
use crate::domain::layout::{GridRow, MAX_COLUMNS, SectionGrid};
use crate::domain::schema::ColumnInfo;
use crate::domain::widget::{Filter, WidgetKind};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, ServiceError>;

#[derive(Deserialize)]
pub struct CompileRequest {
    pub config: WidgetDraft,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

#[derive(Deserialize)]
pub struct DefaultWidgetRequest {
    pub widget_type: WidgetKind,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

#[derive(Deserialize)]
pub struct RetypeRequest {
    pub config: WidgetDraft,
    pub widget_type: WidgetKind,
}

#[derive(Deserialize)]
pub struct LineLabelsRequest {
    pub config: WidgetDraft,
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct PackRequest {
    pub columns: u8,
    pub widths: Vec<u8>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PackResponse {
    pub columns: u8,
    pub rows: Vec<GridRow>,
    pub remaining: u8,
    pub max_widths: Vec<u8>,
}

#[derive(Deserialize)]
pub struct NewSectionRequest {
    pub title: String,
    #[serde(default = "default_section_columns")]
    pub columns: u8,
}

fn default_section_columns() -> u8 {
    MAX_COLUMNS
}

#[derive(Deserialize)]
pub struct ColumnsRequest {
    pub columns: u8,
}

/// Drop `from` onto `to`; both are ids of siblings.
#[derive(Deserialize)]
pub struct ReorderRequest {
    pub from: String,
    pub to: String,
}

/// Either an explicit span or a finished pointer drag.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ResizeRequest {
    Width { width: u8 },
    Drag(PointerDrag),
}

#[derive(Deserialize)]
pub struct NativeFiltersRequest {
    pub native_filters: Vec<Filter>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Normalize and validate a draft without saving it
pub async fn compile_widget(Json(request): Json<CompileRequest>) -> Json<CompileReport> {
    Json(compile(&request.config, &request.columns))
}

pub async fn default_widget(Json(request): Json<DefaultWidgetRequest>) -> Json<WidgetDraft> {
    Json(default_draft_for(request.widget_type, &request.columns))
}

/// Switch a draft to another kind, dropping fields the new kind cannot use
pub async fn retype_widget(Json(request): Json<RetypeRequest>) -> Json<WidgetDraft> {
    let mut draft = request.config;
    draft.set_widget_type(request.widget_type);
    Json(draft)
}

/// Flip a line draft's data-label switch; a change resets the label mode
pub async fn toggle_line_labels(Json(request): Json<LineLabelsRequest>) -> Json<WidgetDraft> {
    let mut draft = request.config;
    draft.set_line_data_labels(request.enabled);
    Json(draft)
}

pub async fn pack_layout(Json(request): Json<PackRequest>) -> Json<PackResponse> {
    let grid = SectionGrid::new(request.columns, request.widths);
    Json(PackResponse {
        columns: grid.columns(),
        rows: grid.rows(),
        remaining: grid.remaining_capacity(),
        max_widths: grid.max_widths(),
    })
}

pub async fn get_dashboard(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Dashboard> {
    state.dashboard_service.get_dashboard(&id).await.map(Json)
}

/// Compiled config of every widget, in dashboard order
pub async fn inspect_dashboard(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<CompiledWidget>> {
    state.dashboard_service.inspect(&id).await.map(Json)
}

pub async fn save_widget(
    Path((id, section_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(submission): Json<WidgetSubmission>,
) -> ApiResult<Widget> {
    state
        .dashboard_service
        .save_widget(&id, &section_id, submission)
        .await
        .map(Json)
}

pub async fn delete_widget(
    Path((id, _section_id, widget_id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Dashboard> {
    state
        .dashboard_service
        .delete_widget(&id, &widget_id)
        .await
        .map(Json)
}

pub async fn add_section(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewSectionRequest>,
) -> ApiResult<Dashboard> {
    state
        .dashboard_service
        .add_section(&id, &request.title, request.columns)
        .await
        .map(Json)
}

pub async fn remove_section(
    Path((id, section_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Dashboard> {
    state
        .dashboard_service
        .remove_section(&id, &section_id)
        .await
        .map(Json)
}

pub async fn set_section_columns(
    Path((id, section_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ColumnsRequest>,
) -> ApiResult<Dashboard> {
    state
        .dashboard_service
        .set_section_columns(&id, &section_id, request.columns)
        .await
        .map(Json)
}

pub async fn reorder_widgets(
    Path((id, section_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Dashboard> {
    state
        .dashboard_service
        .reorder_widgets(&id, &section_id, &request.from, &request.to)
        .await
        .map(Json)
}

pub async fn reorder_sections(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Dashboard> {
    state
        .dashboard_service
        .reorder_sections(&id, &request.from, &request.to)
        .await
        .map(Json)
}

pub async fn resize_widget(
    Path((id, section_id, widget_id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResizeRequest>,
) -> ApiResult<Dashboard> {
    let service = &state.dashboard_service;
    let resized = match request {
        ResizeRequest::Width { width } => {
            service
                .resize_widget(&id, &section_id, &widget_id, width)
                .await
        }
        ResizeRequest::Drag(drag) => {
            service
                .drag_resize_widget(&id, &section_id, &widget_id, drag)
                .await
        }
    };
    resized.map(Json)
}

/// Accepted immediately; persisted once the filters stop changing
pub async fn update_native_filters(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<NativeFiltersRequest>,
) -> Result<StatusCode, ServiceError> {
    let filters = state
        .dashboard_service
        .prepare_native_filters(&id, &request.native_filters)
        .await?;
    state.native_filters.submit(&id, filters)?;
    Ok(StatusCode::ACCEPTED)
}
