// Widget editing draft: the flat, optional-field shape the editor mutates
// and the external API stores as a widget's `config`.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::schema::{ColumnInfo, ColumnKind};
use super::widget::{
    BucketGranularity, CategoricalConfig, CompositeMetric, Dimension, DreConfig, DreRow,
    DreRowType, Filter, KpiConfig, KpiMeasure, LabelMode, LineConfig, LineLabels, Metric,
    OrderByDraft, TableConfig, TextConfig, TextStyle, TimeConfig, WidgetConfig, WidgetKind,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDraft {
    pub widget_type: WidgetKind,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Vec<OrderByDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_metric: Option<CompositeMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dre_rows: Option<Vec<DreRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dre_percent_base_row_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_column_formats: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_style: Option<TextStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_labels: Option<LineLabels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<u32>,
}

impl WidgetDraft {
    /// A bare draft of the given kind with every optional field unset.
    pub fn empty(kind: WidgetKind) -> Self {
        Self {
            widget_type: kind,
            metrics: Vec::new(),
            dimensions: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            time: None,
            composite_metric: None,
            dre_rows: None,
            dre_percent_base_row_index: None,
            columns: None,
            table_column_formats: None,
            table_page_size: None,
            text_style: None,
            line_labels: None,
            top_n: None,
        }
    }

    /// Switch the draft to another kind, clearing whatever the new kind cannot
    /// use so the editor never shows stale cross-kind fields.
    pub fn set_widget_type(&mut self, kind: WidgetKind) {
        self.widget_type = kind;

        if kind != WidgetKind::Kpi {
            self.composite_metric = None;
        }
        if kind != WidgetKind::Dre {
            self.dre_rows = None;
            self.dre_percent_base_row_index = None;
        }
        if kind != WidgetKind::Table {
            self.columns = None;
            self.table_column_formats = None;
            self.table_page_size = None;
        }
        if kind != WidgetKind::Text {
            self.text_style = None;
        }
        if kind != WidgetKind::Line {
            self.line_labels = None;
            for metric in &mut self.metrics {
                metric.line_y_axis = None;
            }
        }

        match kind {
            WidgetKind::Text => {
                self.metrics.clear();
                self.dimensions.clear();
                self.filters.clear();
                self.order_by.clear();
                self.time = None;
                self.top_n = None;
                self.text_style.get_or_insert_with(TextStyle::default);
            }
            WidgetKind::Kpi => {
                self.seed_count_metric();
                self.dimensions.clear();
                self.order_by.clear();
                self.time = None;
                self.top_n = None;
            }
            WidgetKind::Line => {
                self.seed_count_metric();
                self.dimensions.clear();
                self.top_n = None;
                self.line_labels.get_or_insert_with(LineLabels::default);
            }
            WidgetKind::Bar | WidgetKind::Column | WidgetKind::Donut => {
                self.seed_count_metric();
                self.time = None;
                if kind == WidgetKind::Donut {
                    self.dimensions
                        .retain(|d| matches!(d, Dimension::Column(_)));
                }
            }
            WidgetKind::Table => {
                self.time = None;
                self.top_n = None;
                self.columns.get_or_insert_with(Vec::new);
            }
            WidgetKind::Dre => {
                self.metrics.clear();
                self.dimensions.clear();
                self.order_by.clear();
                self.time = None;
                self.top_n = None;
                self.dre_rows.get_or_insert_with(|| vec![default_dre_row()]);
            }
        }
    }

    /// Flip the line data-label switch. Any change of state resets the
    /// label mode to `both`.
    pub fn set_line_data_labels(&mut self, enabled: bool) {
        let labels = self.line_labels.get_or_insert_with(LineLabels::default);
        if labels.enabled != enabled {
            labels.enabled = enabled;
            labels.mode = LabelMode::Both;
        }
    }

    fn seed_count_metric(&mut self) {
        if self.metrics.is_empty() {
            self.metrics.push(Metric::count());
        }
    }
}

fn default_dre_row() -> DreRow {
    DreRow::new("Revenue", DreRowType::Result, vec![Metric::count()])
}

/// The draft a freshly added widget of `kind` starts from, picking sensible
/// columns out of the view so it can be saved straight away.
pub fn default_draft_for(kind: WidgetKind, columns: &[ColumnInfo]) -> WidgetDraft {
    let first_temporal = columns.iter().find(|c| c.kind == ColumnKind::Temporal);
    let first_categorical = columns.iter().find(|c| c.kind.is_categorical());

    let mut draft = WidgetDraft::empty(kind);
    draft.set_widget_type(kind);

    match kind {
        WidgetKind::Line => {
            draft.time = first_temporal.map(|c| TimeConfig {
                column: c.name.clone(),
                granularity: Default::default(),
            });
        }
        WidgetKind::Bar | WidgetKind::Column => {
            let dimension = match (first_categorical, first_temporal) {
                (Some(c), _) => Some(Dimension::Column(c.name.clone())),
                (None, Some(t)) => Some(Dimension::TemporalBucket {
                    column: t.name.clone(),
                    granularity: BucketGranularity::Month,
                }),
                (None, None) => None,
            };
            draft.dimensions.extend(dimension);
        }
        WidgetKind::Donut => {
            draft
                .dimensions
                .extend(first_categorical.map(|c| Dimension::Column(c.name.clone())));
        }
        WidgetKind::Table => {
            draft.columns = Some(columns.iter().map(|c| c.name.clone()).collect());
        }
        WidgetKind::Text => {
            draft.text_style = Some(TextStyle {
                content: "New text".to_string(),
                ..TextStyle::default()
            });
        }
        WidgetKind::Kpi | WidgetKind::Dre => {}
    }

    draft
}

impl From<WidgetConfig> for WidgetDraft {
    fn from(config: WidgetConfig) -> Self {
        let kind = config.kind();
        let mut draft = WidgetDraft::empty(kind);
        match config {
            WidgetConfig::Kpi(KpiConfig { measure, filters }) => {
                draft.filters = filters;
                match measure {
                    KpiMeasure::Single(metric) => draft.metrics = vec![metric],
                    KpiMeasure::Composite(composite) => draft.composite_metric = Some(composite),
                }
            }
            WidgetConfig::Line(LineConfig {
                time,
                metrics,
                filters,
                order_by,
                labels,
            }) => {
                draft.time = time;
                draft.metrics = metrics;
                draft.filters = filters;
                draft.order_by = order_by.into_iter().map(Into::into).collect();
                draft.line_labels = Some(labels);
            }
            WidgetConfig::Bar(c) | WidgetConfig::Column(c) | WidgetConfig::Donut(c) => {
                let CategoricalConfig {
                    dimensions,
                    metrics,
                    filters,
                    order_by,
                    top_n,
                } = c;
                draft.dimensions = dimensions;
                draft.metrics = metrics;
                draft.filters = filters;
                draft.order_by = order_by.into_iter().map(Into::into).collect();
                draft.top_n = top_n;
            }
            WidgetConfig::Table(TableConfig {
                columns,
                metrics,
                dimensions,
                filters,
                order_by,
                column_formats,
                page_size,
            }) => {
                draft.columns = Some(columns);
                draft.metrics = metrics;
                draft.dimensions = dimensions;
                draft.filters = filters;
                draft.order_by = order_by.into_iter().map(Into::into).collect();
                draft.table_column_formats = Some(column_formats);
                draft.table_page_size = Some(page_size);
            }
            WidgetConfig::Text(TextConfig { style }) => draft.text_style = Some(style),
            WidgetConfig::Dre(DreConfig {
                rows,
                percent_base_row_index,
                filters,
            }) => {
                draft.dre_rows = Some(rows);
                draft.dre_percent_base_row_index = percent_base_row_index;
                draft.filters = filters;
            }
        }
        draft
    }
}
