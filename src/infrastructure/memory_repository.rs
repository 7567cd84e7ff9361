// In-process repository for local runs and tests
use crate::application::dashboard_repository::{DashboardRepository, NewWidget};
use crate::domain::dashboard::{Dashboard, SectionLayout, Widget};
use crate::domain::schema::ColumnInfo;
use crate::domain::widget::Filter;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Initial contents: dashboards plus the columns of each view they query.
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub dashboards: Vec<Dashboard>,
    #[serde(default)]
    pub views: HashMap<String, Vec<ColumnInfo>>,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    dashboards: RwLock<HashMap<String, Dashboard>>,
    views: RwLock<HashMap<String, Vec<ColumnInfo>>>,
    next_id: AtomicU64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let dashboards = seed
            .dashboards
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        Self {
            dashboards: RwLock::new(dashboards),
            views: RwLock::new(seed.views),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn load_seed(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seed file {}", path.display()))?;
        tracing::info!(
            "Loaded {} dashboards and {} views from {}",
            seed.dashboards.len(),
            seed.views.len(),
            path.display()
        );
        Ok(Self::from_seed(seed))
    }

    fn next_widget_id(&self) -> String {
        format!("widget-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Run `edit` against a stored dashboard and stamp it as updated.
    async fn modify<T>(
        &self,
        dashboard_id: &str,
        edit: impl FnOnce(&mut Dashboard) -> Result<T>,
    ) -> Result<T> {
        let mut dashboards = self.dashboards.write().await;
        let dashboard = dashboards
            .get_mut(dashboard_id)
            .with_context(|| format!("Dashboard {} does not exist", dashboard_id))?;
        let result = edit(dashboard)?;
        dashboard.updated_at = Some(Utc::now());
        Ok(result)
    }
}

#[async_trait]
impl DashboardRepository for MemoryRepository {
    async fn get_dashboard(&self, dashboard_id: &str) -> Result<Option<Dashboard>> {
        Ok(self.dashboards.read().await.get(dashboard_id).cloned())
    }

    async fn list_view_columns(&self, view_id: &str) -> Result<Vec<ColumnInfo>> {
        self.views
            .read()
            .await
            .get(view_id)
            .cloned()
            .with_context(|| format!("View {} does not exist", view_id))
    }

    async fn create_widget(&self, dashboard_id: &str, widget: &NewWidget) -> Result<Widget> {
        let created = Widget {
            id: self.next_widget_id(),
            title: widget.title.clone(),
            show_title: widget.show_title,
            config: widget.config.clone(),
            size: widget.size,
        };
        self.modify(dashboard_id, |dashboard| {
            let section = dashboard
                .sections
                .iter_mut()
                .find(|s| s.id == widget.section_id)
                .with_context(|| format!("Section {} does not exist", widget.section_id))?;
            section.widgets.push(created.clone());
            Ok(created)
        })
        .await
    }

    async fn update_widget(&self, dashboard_id: &str, widget: &Widget) -> Result<Widget> {
        self.modify(dashboard_id, |dashboard| {
            let slot = dashboard
                .sections
                .iter_mut()
                .flat_map(|s| s.widgets.iter_mut())
                .find(|w| w.id == widget.id)
                .with_context(|| format!("Widget {} does not exist", widget.id))?;
            *slot = widget.clone();
            Ok(widget.clone())
        })
        .await
    }

    async fn delete_widget(&self, dashboard_id: &str, widget_id: &str) -> Result<()> {
        self.modify(dashboard_id, |dashboard| {
            *dashboard = dashboard.without_widget(widget_id);
            Ok(())
        })
        .await
    }

    async fn save_layout(&self, dashboard_id: &str, layout: &[SectionLayout]) -> Result<()> {
        self.modify(dashboard_id, |dashboard| {
            *dashboard = dashboard.apply_layout(layout);
            Ok(())
        })
        .await
    }

    async fn save_native_filters(&self, dashboard_id: &str, filters: &[Filter]) -> Result<()> {
        self.modify(dashboard_id, |dashboard| {
            dashboard.native_filters = filters.to_vec();
            Ok(())
        })
        .await
    }
}
