// Config validator - checks a normalized widget configuration against the
// columns of its view before it may be persisted.
use crate::domain::schema::{ColumnInfo, ColumnKind, ViewSchema};
use crate::domain::widget::{
    AggOp, CategoricalConfig, Dimension, DreConfig, DreRowType, Filter, FilterOp, KpiConfig, KpiMeasure,
    LABEL_SENSITIVITY_MAX, LABEL_SENSITIVITY_MIN, LineConfig, Metric, TableConfig, TextConfig,
    WidgetConfig, WidgetKind,
};
use thiserror::Error;

const LABEL_WINDOWS: [u8; 3] = [3, 5, 7];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("Aggregation {op} requires a column.")]
    MetricColumnRequired { op: AggOp },
    #[error("Column '{column}' does not exist in the view.")]
    UnknownColumn { column: String },
    #[error("Aggregation {op} requires a numeric column, '{column}' is not numeric.")]
    NonNumericColumn { op: AggOp, column: String },
    #[error("Composite metric requires a time column.")]
    CompositeTimeColumnRequired,
    #[error("Composite metric time column '{column}' must be temporal.")]
    CompositeTimeColumnNotTemporal { column: String },
    #[error("Line chart requires a time column.")]
    LineTimeColumnRequired,
    #[error("Line chart time column '{column}' must be temporal.")]
    LineTimeColumnNotTemporal { column: String },
    #[error("Line chart requires 1 or 2 metrics (found {count}).")]
    LineMetricCount { count: usize },
    #[error("Data label sensitivity must be between 25% and 100% (found {value}%).")]
    LabelSensitivityOutOfRange { value: u8 },
    #[error("Data label window must be 3, 5 or 7 (found {value}).")]
    LabelWindowInvalid { value: u8 },
    #[error("Minimum gap between data labels must be at least 1.")]
    LabelGapInvalid,
    #[error("{kind} chart requires exactly 1 dimension (found {count}).")]
    DimensionCount { kind: WidgetKind, count: usize },
    #[error("{kind} chart requires exactly 1 metric (found {count}).")]
    MetricCount { kind: WidgetKind, count: usize },
    #[error("Dimension '{column}' must be a categorical column.")]
    DimensionNotCategorical { column: String },
    #[error("{kind} chart cannot group by a time bucket.")]
    TemporalBucketNotAllowed { kind: WidgetKind },
    #[error("Time bucket column '{column}' must be temporal.")]
    TemporalBucketNotTemporal { column: String },
    #[error("Table requires at least one column.")]
    TableColumnsRequired,
    #[error("Text content is required.")]
    TextContentRequired,
    #[error("Statement requires at least one row.")]
    DreRowsRequired,
    #[error("Statement requires at least one result row as percent base.")]
    DreResultRowRequired,
    #[error("Row title is required.")]
    DreRowTitleRequired,
    #[error("Row requires at least one metric.")]
    DreRowMetricsRequired,
    #[error("Row {row}: {violation}")]
    DreRow { row: usize, violation: Box<Violation> },
    #[error("Relative date filter on '{column}' requires a temporal column.")]
    RelativeFilterNotTemporal { column: String },
    #[error("Relative date filter on '{column}' has no valid period.")]
    RelativePresetInvalid { column: String },
}

/// Human-readable violations; empty means the configuration can be saved.
pub fn validate(config: &WidgetConfig, columns: &[ColumnInfo]) -> Vec<String> {
    check(config, columns)
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Typed form of [`validate`]. Never mutates the configuration.
pub fn check(config: &WidgetConfig, columns: &[ColumnInfo]) -> Vec<Violation> {
    let schema = ViewSchema::new(columns);
    let mut violations = Vec::new();

    match config {
        WidgetConfig::Kpi(kpi) => check_kpi(kpi, &schema, &mut violations),
        WidgetConfig::Line(line) => check_line(line, &schema, &mut violations),
        WidgetConfig::Bar(c) => check_categorical(WidgetKind::Bar, c, &schema, &mut violations),
        WidgetConfig::Column(c) => {
            check_categorical(WidgetKind::Column, c, &schema, &mut violations)
        }
        WidgetConfig::Donut(c) => check_categorical(WidgetKind::Donut, c, &schema, &mut violations),
        WidgetConfig::Table(table) => check_table(table, &schema, &mut violations),
        WidgetConfig::Text(text) => check_text(text, &mut violations),
        WidgetConfig::Dre(dre) => check_dre(dre, &schema, &mut violations),
    }
    check_filters(config.filters(), &schema, &mut violations);

    if !violations.is_empty() {
        tracing::debug!(
            widget_type = %config.kind(),
            count = violations.len(),
            "widget config rejected"
        );
    }
    violations
}

/// Violations of a free-standing filter list, such as a dashboard's native
/// filters. Expects filters already compiled by the normalizer.
pub fn validate_filters(filters: &[Filter], columns: &[ColumnInfo]) -> Vec<String> {
    let mut violations = Vec::new();
    check_filters(filters, &ViewSchema::new(columns), &mut violations);
    violations.iter().map(ToString::to_string).collect()
}

fn check_metric(metric: &Metric, schema: &ViewSchema, out: &mut Vec<Violation>) {
    let column = metric
        .column
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let Some(column) = column else {
        if metric.op.requires_column() {
            out.push(Violation::MetricColumnRequired { op: metric.op });
        }
        return;
    };

    match schema.kind_of(column) {
        None => out.push(Violation::UnknownColumn {
            column: column.to_string(),
        }),
        Some(kind) if metric.op.requires_numeric() && kind != ColumnKind::Numeric => {
            out.push(Violation::NonNumericColumn {
                op: metric.op,
                column: column.to_string(),
            })
        }
        Some(_) => {}
    }
}

fn check_temporal(
    column: &str,
    schema: &ViewSchema,
    out: &mut Vec<Violation>,
    not_temporal: impl FnOnce(String) -> Violation,
) {
    match schema.kind_of(column) {
        None => out.push(Violation::UnknownColumn {
            column: column.to_string(),
        }),
        Some(ColumnKind::Temporal) => {}
        Some(_) => out.push(not_temporal(column.to_string())),
    }
}

fn check_kpi(kpi: &KpiConfig, schema: &ViewSchema, out: &mut Vec<Violation>) {
    check_metric(&kpi.effective_metric(), schema, out);

    if let KpiMeasure::Composite(composite) = &kpi.measure {
        let time_column = composite.time_column.trim();
        if time_column.is_empty() {
            out.push(Violation::CompositeTimeColumnRequired);
        } else {
            check_temporal(time_column, schema, out, |column| {
                Violation::CompositeTimeColumnNotTemporal { column }
            });
        }
    }
}

fn check_line(line: &LineConfig, schema: &ViewSchema, out: &mut Vec<Violation>) {
    match line.time.as_ref().map(|t| t.column.trim()) {
        Some(column) if !column.is_empty() => {
            check_temporal(column, schema, out, |column| {
                Violation::LineTimeColumnNotTemporal { column }
            });
        }
        _ => out.push(Violation::LineTimeColumnRequired),
    }

    if !(1..=2).contains(&line.metrics.len()) {
        out.push(Violation::LineMetricCount {
            count: line.metrics.len(),
        });
    }
    for metric in &line.metrics {
        check_metric(metric, schema, out);
    }

    let labels = &line.labels;
    if !(LABEL_SENSITIVITY_MIN..=LABEL_SENSITIVITY_MAX).contains(&labels.sensitivity) {
        out.push(Violation::LabelSensitivityOutOfRange {
            value: labels.sensitivity,
        });
    }
    if !LABEL_WINDOWS.contains(&labels.window) {
        out.push(Violation::LabelWindowInvalid {
            value: labels.window,
        });
    }
    if labels.min_gap < 1 {
        out.push(Violation::LabelGapInvalid);
    }
}

fn check_categorical(
    kind: WidgetKind,
    config: &CategoricalConfig,
    schema: &ViewSchema,
    out: &mut Vec<Violation>,
) {
    if config.dimensions.len() != 1 {
        out.push(Violation::DimensionCount {
            kind,
            count: config.dimensions.len(),
        });
    }
    if config.metrics.len() != 1 {
        out.push(Violation::MetricCount {
            kind,
            count: config.metrics.len(),
        });
    }

    if let [dimension] = config.dimensions.as_slice() {
        match dimension {
            Dimension::Column(column) => match schema.kind_of(column) {
                None => out.push(Violation::UnknownColumn {
                    column: column.clone(),
                }),
                Some(k) if k.is_categorical() => {}
                Some(_) => out.push(Violation::DimensionNotCategorical {
                    column: column.clone(),
                }),
            },
            Dimension::TemporalBucket { column, .. } => {
                if kind.allows_temporal_bucket() {
                    check_temporal(column, schema, out, |column| {
                        Violation::TemporalBucketNotTemporal { column }
                    });
                } else {
                    out.push(Violation::TemporalBucketNotAllowed { kind });
                }
            }
        }
    }

    for metric in &config.metrics {
        check_metric(metric, schema, out);
    }
}

fn check_table(table: &TableConfig, schema: &ViewSchema, out: &mut Vec<Violation>) {
    if table.columns.is_empty() {
        out.push(Violation::TableColumnsRequired);
    }
    for column in &table.columns {
        if !schema.contains(column) {
            out.push(Violation::UnknownColumn {
                column: column.clone(),
            });
        }
    }
    for metric in &table.metrics {
        check_metric(metric, schema, out);
    }
}

fn check_text(text: &TextConfig, out: &mut Vec<Violation>) {
    if text.style.content.trim().is_empty() {
        out.push(Violation::TextContentRequired);
    }
}

fn check_dre(dre: &DreConfig, schema: &ViewSchema, out: &mut Vec<Violation>) {
    if dre.rows.is_empty() {
        out.push(Violation::DreRowsRequired);
        return;
    }
    if !dre.rows.iter().any(|r| r.row_type == DreRowType::Result) {
        out.push(Violation::DreResultRowRequired);
    }

    for (index, row) in dre.rows.iter().enumerate() {
        let mut row_violations = Vec::new();
        if row.title.trim().is_empty() {
            row_violations.push(Violation::DreRowTitleRequired);
        }
        if row.metrics.is_empty() {
            row_violations.push(Violation::DreRowMetricsRequired);
        }
        for metric in &row.metrics {
            check_metric(metric, schema, &mut row_violations);
        }
        out.extend(row_violations.into_iter().map(|violation| Violation::DreRow {
            row: index + 1,
            violation: Box::new(violation),
        }));
    }
}

fn check_filters(filters: &[Filter], schema: &ViewSchema, out: &mut Vec<Violation>) {
    for filter in filters {
        let kind = schema.kind_of(&filter.column);
        if kind.is_none() {
            out.push(Violation::UnknownColumn {
                column: filter.column.clone(),
            });
            continue;
        }

        if filter.op == FilterOp::Relative {
            // a relative filter survives normalization only with a bad period
            out.push(Violation::RelativePresetInvalid {
                column: filter.column.clone(),
            });
        } else if filter.is_relative() && kind != Some(ColumnKind::Temporal) {
            out.push(Violation::RelativeFilterNotTemporal {
                column: filter.column.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::normalizer::normalize;
    use crate::domain::draft::{WidgetDraft, default_draft_for};
    use crate::domain::widget::{
        CompositeMetric, DreRow, FilterValue, LineLabels, RelativePreset, TimeConfig,
        TimeGranularity,
    };

    fn columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo::new("region", ColumnKind::Text),
            ColumnInfo::new("active", ColumnKind::Boolean),
            ColumnInfo::new("revenue", ColumnKind::Numeric),
            ColumnInfo::new("sold_at", ColumnKind::Temporal),
        ]
    }

    fn kpi_draft(metric: Metric) -> WidgetDraft {
        let mut draft = WidgetDraft::empty(WidgetKind::Kpi);
        draft.metrics = vec![metric];
        draft
    }

    #[test]
    fn test_every_default_widget_is_savable() {
        for kind in WidgetKind::ALL {
            let config = normalize(&default_draft_for(kind, &columns()));
            assert_eq!(validate(&config, &columns()), Vec::<String>::new(), "{kind}");
        }
    }

    #[test]
    fn test_kpi_sum_over_numeric_is_valid() {
        let draft = kpi_draft(Metric::new(AggOp::Sum, Some("revenue")));
        assert!(validate(&normalize(&draft), &columns()).is_empty());
    }

    #[test]
    fn test_kpi_composite_requires_time_column() {
        let mut draft = kpi_draft(Metric::new(AggOp::Sum, Some("revenue")));
        draft.composite_metric = Some(CompositeMetric {
            inner_agg: AggOp::Sum,
            outer_agg: AggOp::Avg,
            value_column: Some("revenue".to_string()),
            time_column: String::new(),
            granularity: TimeGranularity::Month,
        });
        let violations = check(&normalize(&draft), &columns());
        assert_eq!(violations, vec![Violation::CompositeTimeColumnRequired]);

        draft.composite_metric.as_mut().unwrap().time_column = "region".to_string();
        let violations = check(&normalize(&draft), &columns());
        assert_eq!(
            violations,
            vec![Violation::CompositeTimeColumnNotTemporal {
                column: "region".to_string()
            }]
        );
    }

    #[test]
    fn test_kpi_numeric_aggregation_over_text_column() {
        let draft = kpi_draft(Metric::new(AggOp::Avg, Some("region")));
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::NonNumericColumn {
                op: AggOp::Avg,
                column: "region".to_string()
            }]
        );

        let draft = kpi_draft(Metric::new(AggOp::DistinctCount, None));
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::MetricColumnRequired {
                op: AggOp::DistinctCount
            }]
        );
    }

    #[test]
    fn test_bar_requires_one_dimension() {
        let mut draft = WidgetDraft::empty(WidgetKind::Bar);
        draft.metrics = vec![Metric::count()];
        let violations = check(&normalize(&draft), &columns());
        assert_eq!(
            violations,
            vec![Violation::DimensionCount {
                kind: WidgetKind::Bar,
                count: 0
            }]
        );
        assert_eq!(
            violations[0].to_string(),
            "bar chart requires exactly 1 dimension (found 0)."
        );

        draft.dimensions = vec![Dimension::parse("region")];
        assert!(check(&normalize(&draft), &columns()).is_empty());
    }

    #[test]
    fn test_categorical_dimension_rules() {
        let mut draft = WidgetDraft::empty(WidgetKind::Column);
        draft.metrics = vec![Metric::count()];
        draft.dimensions = vec![Dimension::parse("revenue")];
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::DimensionNotCategorical {
                column: "revenue".to_string()
            }]
        );

        draft.dimensions = vec![Dimension::parse("__time_weekday__:sold_at")];
        assert!(check(&normalize(&draft), &columns()).is_empty());

        draft.dimensions = vec![Dimension::parse("__time_hour__:region")];
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::TemporalBucketNotTemporal {
                column: "region".to_string()
            }]
        );

        draft.widget_type = WidgetKind::Donut;
        draft.dimensions = vec![Dimension::parse("__time_month__:sold_at")];
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::TemporalBucketNotAllowed {
                kind: WidgetKind::Donut
            }]
        );

        draft.dimensions = vec![Dimension::parse("active")];
        draft.metrics = vec![Metric::count(), Metric::count()];
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::MetricCount {
                kind: WidgetKind::Donut,
                count: 2
            }]
        );
    }

    #[test]
    fn test_line_rules() {
        let mut draft = WidgetDraft::empty(WidgetKind::Line);
        draft.metrics = vec![Metric::count()];
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::LineTimeColumnRequired]
        );

        draft.time = Some(TimeConfig {
            column: "revenue".to_string(),
            granularity: TimeGranularity::Day,
        });
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::LineTimeColumnNotTemporal {
                column: "revenue".to_string()
            }]
        );
    }

    #[test]
    fn test_line_label_settings_checked_on_raw_config() {
        let config = WidgetConfig::Line(LineConfig {
            time: Some(TimeConfig {
                column: "sold_at".to_string(),
                granularity: TimeGranularity::Day,
            }),
            metrics: vec![],
            filters: vec![],
            order_by: vec![],
            labels: LineLabels {
                sensitivity: 10,
                window: 4,
                min_gap: 0,
                ..LineLabels::default()
            },
        });
        assert_eq!(
            check(&config, &columns()),
            vec![
                Violation::LineMetricCount { count: 0 },
                Violation::LabelSensitivityOutOfRange { value: 10 },
                Violation::LabelWindowInvalid { value: 4 },
                Violation::LabelGapInvalid,
            ]
        );
    }

    #[test]
    fn test_table_rules() {
        let mut draft = WidgetDraft::empty(WidgetKind::Table);
        draft.columns = Some(vec![]);
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::TableColumnsRequired]
        );

        draft.columns = Some(vec!["region".to_string(), "margin".to_string()]);
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::UnknownColumn {
                column: "margin".to_string()
            }]
        );
    }

    #[test]
    fn test_text_requires_content() {
        let mut draft = WidgetDraft::empty(WidgetKind::Text);
        draft.set_widget_type(WidgetKind::Text);
        draft.text_style.as_mut().unwrap().content = "   \n".to_string();
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::TextContentRequired]
        );
    }

    #[test]
    fn test_dre_rules() {
        let mut draft = WidgetDraft::empty(WidgetKind::Dre);
        draft.dre_rows = Some(vec![]);
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![Violation::DreRowsRequired]
        );

        draft.dre_rows = Some(vec![
            DreRow::new("Deductions", DreRowType::Deduction, vec![Metric::count()]),
            DreRow::new(" ", DreRowType::Detail, vec![]),
            DreRow::new(
                "Taxes",
                DreRowType::Detail,
                vec![
                    Metric::new(AggOp::Sum, Some("region")),
                    Metric::new(AggOp::DistinctCount, Some("missing")),
                ],
            ),
        ]);
        let violations = check(&normalize(&draft), &columns());
        assert_eq!(violations[0], Violation::DreResultRowRequired);
        assert_eq!(
            violations[1..],
            [
                Violation::DreRow {
                    row: 2,
                    violation: Box::new(Violation::DreRowTitleRequired)
                },
                Violation::DreRow {
                    row: 2,
                    violation: Box::new(Violation::DreRowMetricsRequired)
                },
                Violation::DreRow {
                    row: 3,
                    violation: Box::new(Violation::NonNumericColumn {
                        op: AggOp::Sum,
                        column: "region".to_string()
                    })
                },
                Violation::DreRow {
                    row: 3,
                    violation: Box::new(Violation::UnknownColumn {
                        column: "missing".to_string()
                    })
                },
            ]
        );
        assert_eq!(violations[1].to_string(), "Row 2: Row title is required.");
    }

    #[test]
    fn test_filter_rules() {
        let mut draft = kpi_draft(Metric::count());
        draft.filters = vec![
            Filter::new("ghost", FilterOp::Eq, None),
            Filter::relative("region", RelativePreset::Today),
            Filter::new(
                "sold_at",
                FilterOp::Relative,
                Some(FilterValue::Scalar(serde_json::json!("next_century"))),
            ),
            Filter::relative("sold_at", RelativePreset::LastMonth),
        ];
        assert_eq!(
            check(&normalize(&draft), &columns()),
            vec![
                Violation::UnknownColumn {
                    column: "ghost".to_string()
                },
                Violation::RelativeFilterNotTemporal {
                    column: "region".to_string()
                },
                Violation::RelativePresetInvalid {
                    column: "sold_at".to_string()
                },
            ]
        );
    }
}
