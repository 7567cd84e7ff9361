// Test fixtures shared by the application and presentation tests
use crate::application::dashboard_repository::{DashboardRepository, NewWidget};
use crate::domain::dashboard::{Dashboard, Section, SectionLayout, Widget};
use crate::domain::schema::{ColumnInfo, ColumnKind};
use crate::domain::widget::{
    AggOp, Filter, KpiConfig, KpiMeasure, Metric, WidgetConfig, WidgetHeight, WidgetSize,
};
use crate::infrastructure::memory_repository::{MemoryRepository, Seed};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn sample_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("amount", ColumnKind::Numeric),
        ColumnInfo::new("region", ColumnKind::Text),
        ColumnInfo::new("sold_at", ColumnKind::Temporal),
        ColumnInfo::new("paid", ColumnKind::Boolean),
    ]
}

fn kpi(id: &str, metric: Metric, width: u8) -> Widget {
    Widget {
        id: id.to_string(),
        title: id.to_string(),
        show_title: true,
        config: WidgetConfig::Kpi(KpiConfig {
            measure: KpiMeasure::Single(metric),
            filters: vec![],
        }),
        size: WidgetSize::new(width, WidgetHeight::Full),
    }
}

/// Dashboard `sales` with one 3-column section `overview` holding
/// `revenue` (width 2) and `orders` (width 1).
pub fn sample_dashboard() -> Dashboard {
    let overview = Section::new("overview", "Overview", 3)
        .with_widget(kpi("revenue", Metric::new(AggOp::Sum, Some("amount")), 2))
        .with_widget(kpi("orders", Metric::count(), 1));
    Dashboard::new("sales", "Sales", "orders_view").with_section(overview)
}

/// Memory-backed repository that counts writes and can be told to fail them.
pub struct FlakyRepository {
    inner: MemoryRepository,
    fail_writes: AtomicBool,
    widget_writes: AtomicUsize,
    native_filter_saves: Mutex<Vec<(String, Vec<Filter>)>>,
}

impl FlakyRepository {
    pub fn seeded() -> Self {
        let seed = Seed {
            dashboards: vec![sample_dashboard()],
            views: HashMap::from([("orders_view".to_string(), sample_columns())]),
        };
        Self {
            inner: MemoryRepository::from_seed(seed),
            fail_writes: AtomicBool::new(false),
            widget_writes: AtomicUsize::new(0),
            native_filter_saves: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn widget_writes(&self) -> usize {
        self.widget_writes.load(Ordering::SeqCst)
    }

    pub fn native_filter_saves(&self) -> Vec<(String, Vec<Filter>)> {
        self.native_filter_saves.lock().unwrap().clone()
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("Dashboard API failed with status 503 Service Unavailable: maintenance");
        }
        Ok(())
    }
}

#[async_trait]
impl DashboardRepository for FlakyRepository {
    async fn get_dashboard(&self, dashboard_id: &str) -> anyhow::Result<Option<Dashboard>> {
        self.inner.get_dashboard(dashboard_id).await
    }

    async fn list_view_columns(&self, view_id: &str) -> anyhow::Result<Vec<ColumnInfo>> {
        self.inner.list_view_columns(view_id).await
    }

    async fn create_widget(&self, dashboard_id: &str, widget: &NewWidget) -> anyhow::Result<Widget> {
        self.widget_writes.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.create_widget(dashboard_id, widget).await
    }

    async fn update_widget(&self, dashboard_id: &str, widget: &Widget) -> anyhow::Result<Widget> {
        self.widget_writes.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.update_widget(dashboard_id, widget).await
    }

    async fn delete_widget(&self, dashboard_id: &str, widget_id: &str) -> anyhow::Result<()> {
        self.check_writable()?;
        self.inner.delete_widget(dashboard_id, widget_id).await
    }

    async fn save_layout(&self, dashboard_id: &str, layout: &[SectionLayout]) -> anyhow::Result<()> {
        self.check_writable()?;
        self.inner.save_layout(dashboard_id, layout).await
    }

    async fn save_native_filters(&self, dashboard_id: &str, filters: &[Filter]) -> anyhow::Result<()> {
        self.native_filter_saves
            .lock()
            .unwrap()
            .push((dashboard_id.to_string(), filters.to_vec()));
        self.check_writable()?;
        self.inner.save_native_filters(dashboard_id, filters).await
    }
}
