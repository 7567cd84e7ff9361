// Repository trait for dashboard persistence (the external dashboard API)
use crate::domain::dashboard::{Dashboard, SectionLayout, Widget};
use crate::domain::schema::ColumnInfo;
use crate::domain::widget::{Filter, WidgetConfig, WidgetSize};
use async_trait::async_trait;
use serde::Serialize;

/// A widget that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewWidget {
    pub section_id: String,
    pub title: String,
    pub show_title: bool,
    pub config: WidgetConfig,
    pub size: WidgetSize,
}

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn get_dashboard(&self, dashboard_id: &str) -> anyhow::Result<Option<Dashboard>>;

    /// Columns of a view, with their types
    async fn list_view_columns(&self, view_id: &str) -> anyhow::Result<Vec<ColumnInfo>>;

    /// Create a widget; the returned widget carries its assigned id
    async fn create_widget(&self, dashboard_id: &str, widget: &NewWidget) -> anyhow::Result<Widget>;

    async fn update_widget(&self, dashboard_id: &str, widget: &Widget) -> anyhow::Result<Widget>;

    async fn delete_widget(&self, dashboard_id: &str, widget_id: &str) -> anyhow::Result<()>;

    /// Replace the dashboard's section layout
    async fn save_layout(&self, dashboard_id: &str, layout: &[SectionLayout]) -> anyhow::Result<()>;

    async fn save_native_filters(&self, dashboard_id: &str, filters: &[Filter]) -> anyhow::Result<()>;
}
