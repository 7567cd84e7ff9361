// Dashboard service - Use cases for editing widgets and section layout
use crate::application::dashboard_repository::{DashboardRepository, NewWidget};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::normalizer::{compile_filters, normalize};
use crate::application::validator::{validate, validate_filters};
use crate::domain::dashboard::{Dashboard, Section, Widget};
use crate::domain::draft::WidgetDraft;
use crate::domain::resize::{GridMetrics, ResizeGesture, Subscription};
use crate::domain::schema::ColumnInfo;
use crate::domain::widget::{Filter, WidgetConfig, WidgetSize};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A widget as submitted by the editor on save.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetSubmission {
    /// Absent for widgets that have never been saved
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub show_title: bool,
    #[serde(default)]
    pub size: WidgetSize,
    pub config: WidgetDraft,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileReport {
    pub config: WidgetConfig,
    pub violations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Compiled configuration of one widget, in dashboard order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledWidget {
    pub section_id: String,
    pub widget_id: String,
    pub config: WidgetConfig,
}

/// A finished drag on a widget's resize handle, in pixels.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PointerDrag {
    pub start_x: f64,
    pub pointer_x: f64,
    pub grid_width_px: f64,
    #[serde(default)]
    pub gap_px: f64,
}

/// Normalize a draft and validate the result without persisting anything.
pub fn compile(draft: &WidgetDraft, columns: &[ColumnInfo]) -> CompileReport {
    let config = normalize(draft);
    let violations = validate(&config, columns);
    let description = config.description();
    CompileReport {
        config,
        violations,
        description,
    }
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn DashboardRepository>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_dashboard(&self, dashboard_id: &str) -> ServiceResult<Dashboard> {
        self.repository
            .get_dashboard(dashboard_id)
            .await?
            .ok_or_else(|| ServiceError::dashboard_not_found(dashboard_id))
    }

    pub async fn inspect(&self, dashboard_id: &str) -> ServiceResult<Vec<CompiledWidget>> {
        let dashboard = self.get_dashboard(dashboard_id).await?;
        Ok(dashboard
            .sections
            .iter()
            .flat_map(|section| {
                section.widgets.iter().map(|widget| CompiledWidget {
                    section_id: section.id.clone(),
                    widget_id: widget.id.clone(),
                    config: widget.config.clone(),
                })
            })
            .collect())
    }

    /// Compile, validate and persist a widget. Nothing reaches the repository
    /// when validation fails.
    pub async fn save_widget(
        &self,
        dashboard_id: &str,
        section_id: &str,
        submission: WidgetSubmission,
    ) -> ServiceResult<Widget> {
        let dashboard = self.get_dashboard(dashboard_id).await?;
        let section = dashboard
            .section(section_id)
            .ok_or_else(|| ServiceError::section_not_found(section_id))?;

        let columns = self.repository.list_view_columns(&dashboard.view_id).await?;
        let config = normalize(&submission.config);
        let violations = validate(&config, &columns);
        if !violations.is_empty() {
            tracing::info!(
                dashboard_id,
                section_id,
                widget_type = %config.kind(),
                "widget save rejected: {}",
                violations.join(" ")
            );
            return Err(ServiceError::Validation(violations));
        }

        let saved = match submission.id {
            Some(widget_id) => {
                if section.widget_index(&widget_id).is_none() {
                    return Err(ServiceError::widget_not_found(&widget_id));
                }
                let widget = Widget {
                    id: widget_id,
                    title: submission.title,
                    show_title: submission.show_title,
                    config,
                    size: submission.size,
                };
                self.repository.update_widget(dashboard_id, &widget).await?
            }
            None => {
                let widget = NewWidget {
                    section_id: section_id.to_string(),
                    title: submission.title,
                    show_title: submission.show_title,
                    config,
                    size: submission.size,
                };
                self.repository.create_widget(dashboard_id, &widget).await?
            }
        };

        tracing::info!(
            dashboard_id,
            section_id,
            widget_id = %saved.id,
            widget_type = %saved.config.kind(),
            "widget saved"
        );
        Ok(saved)
    }

    pub async fn delete_widget(&self, dashboard_id: &str, widget_id: &str) -> ServiceResult<Dashboard> {
        let dashboard = self.get_dashboard(dashboard_id).await?;
        if dashboard.find_widget(widget_id).is_none() {
            return Err(ServiceError::widget_not_found(widget_id));
        }
        self.repository.delete_widget(dashboard_id, widget_id).await?;
        tracing::info!(dashboard_id, widget_id, "widget deleted");
        Ok(dashboard.without_widget(widget_id))
    }

    pub async fn add_section(
        &self,
        dashboard_id: &str,
        title: &str,
        columns: u8,
    ) -> ServiceResult<Dashboard> {
        let dashboard = self.get_dashboard(dashboard_id).await?;
        let section = Section::new(&new_section_id(), title, columns);
        Ok(self.commit_layout(dashboard.with_section(section)).await)
    }

    pub async fn remove_section(&self, dashboard_id: &str, section_id: &str) -> ServiceResult<Dashboard> {
        let dashboard = self.get_dashboard(dashboard_id).await?;
        if dashboard.section(section_id).is_none() {
            return Err(ServiceError::section_not_found(section_id));
        }
        Ok(self.commit_layout(dashboard.without_section(section_id)).await)
    }

    pub async fn set_section_columns(
        &self,
        dashboard_id: &str,
        section_id: &str,
        columns: u8,
    ) -> ServiceResult<Dashboard> {
        let (dashboard, section) = self.load_section(dashboard_id, section_id).await?;
        let updated = dashboard.with_section(section.with_columns(columns));
        Ok(self.commit_layout(updated).await)
    }

    /// Drop widget `from_id` onto widget `to_id` within one section.
    pub async fn reorder_widgets(
        &self,
        dashboard_id: &str,
        section_id: &str,
        from_id: &str,
        to_id: &str,
    ) -> ServiceResult<Dashboard> {
        let (dashboard, section) = self.load_section(dashboard_id, section_id).await?;
        let reordered = section.reorder_widgets(from_id, to_id).ok_or_else(|| {
            ServiceError::NotFound(format!("widgets {from_id} / {to_id} in section {section_id}"))
        })?;
        Ok(self.commit_layout(dashboard.with_section(reordered)).await)
    }

    pub async fn reorder_sections(
        &self,
        dashboard_id: &str,
        from_id: &str,
        to_id: &str,
    ) -> ServiceResult<Dashboard> {
        let dashboard = self.get_dashboard(dashboard_id).await?;
        let reordered = dashboard
            .reorder_sections(from_id, to_id)
            .ok_or_else(|| ServiceError::NotFound(format!("sections {from_id} / {to_id}")))?;
        Ok(self.commit_layout(reordered).await)
    }

    /// Set a widget's width, clamped to what its row can hold.
    pub async fn resize_widget(
        &self,
        dashboard_id: &str,
        section_id: &str,
        widget_id: &str,
        width: u8,
    ) -> ServiceResult<Dashboard> {
        let (dashboard, section) = self.load_section(dashboard_id, section_id).await?;
        let max_width = section
            .widget_index(widget_id)
            .and_then(|index| section.grid().max_width_at(index))
            .ok_or_else(|| ServiceError::widget_not_found(widget_id))?;
        let width = width.clamp(1, max_width);
        tracing::debug!(dashboard_id, section_id, widget_id, width, max_width, "widget resized");
        let updated = dashboard.with_section(section.with_widget_width(widget_id, width));
        Ok(self.commit_layout(updated).await)
    }

    /// Resize from a pointer drag: the span follows the pointer in whole
    /// cells and never exceeds what the widget's row can hold.
    pub async fn drag_resize_widget(
        &self,
        dashboard_id: &str,
        section_id: &str,
        widget_id: &str,
        drag: PointerDrag,
    ) -> ServiceResult<Dashboard> {
        let (dashboard, section) = self.load_section(dashboard_id, section_id).await?;
        let index = section
            .widget_index(widget_id)
            .ok_or_else(|| ServiceError::widget_not_found(widget_id))?;
        let metrics = GridMetrics {
            grid_width_px: drag.grid_width_px,
            gap_px: drag.gap_px,
            columns: section.columns,
        };

        let mut gesture = ResizeGesture::new();
        gesture.begin(
            widget_id,
            index,
            &section.grid(),
            drag.start_x,
            Subscription::detached(),
        );
        let update = gesture
            .pointer_up(drag.pointer_x, &metrics)
            .ok_or_else(|| ServiceError::widget_not_found(widget_id))?;
        tracing::debug!(dashboard_id, section_id, widget_id, width = update.width, "widget dragged");
        let updated = dashboard.with_section(section.with_widget_width(widget_id, update.width));
        Ok(self.commit_layout(updated).await)
    }

    /// Compile native filters the way widget filters are compiled and check
    /// them against the dashboard's view.
    pub async fn prepare_native_filters(
        &self,
        dashboard_id: &str,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Filter>> {
        let dashboard = self.get_dashboard(dashboard_id).await?;
        let columns = self.repository.list_view_columns(&dashboard.view_id).await?;
        let filters = compile_filters(filters);
        let violations = validate_filters(&filters, &columns);
        if !violations.is_empty() {
            return Err(ServiceError::Validation(violations));
        }
        Ok(filters)
    }

    async fn load_section(
        &self,
        dashboard_id: &str,
        section_id: &str,
    ) -> ServiceResult<(Dashboard, Section)> {
        let dashboard = self.get_dashboard(dashboard_id).await?;
        let section = dashboard
            .section(section_id)
            .cloned()
            .ok_or_else(|| ServiceError::section_not_found(section_id))?;
        Ok((dashboard, section))
    }

    /// Layout changes always apply locally; persisting them is best-effort.
    async fn commit_layout(&self, dashboard: Dashboard) -> Dashboard {
        if let Err(e) = self
            .repository
            .save_layout(&dashboard.id, &dashboard.layout())
            .await
        {
            tracing::warn!(dashboard_id = %dashboard.id, "Failed to persist layout: {:#}", e);
        }
        dashboard
    }
}

fn new_section_id() -> String {
    let now = chrono::Utc::now();
    format!(
        "section-{}",
        now.timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros())
    )
}
