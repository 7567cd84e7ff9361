// Config normalizer - compiles an editing draft into the canonical
// configuration for its widget kind.
//
// Deterministic and idempotent: compiling the draft form of a compiled
// config yields the same config. Never fails; malformed input is left for
// the validator to reject.
use std::collections::BTreeMap;

use crate::domain::draft::WidgetDraft;
use crate::domain::widget::{
    CategoricalConfig, CompositeMetric, Dimension, DreConfig, DreRow, DreRowType, Filter,
    FilterOp, FilterValue, KpiConfig, KpiMeasure, LABEL_MIN_GAP, LABEL_SENSITIVITY_MAX,
    LABEL_SENSITIVITY_MIN, LABEL_WINDOW, LineConfig, LineLabels, Metric, OrderBy, OrderByDraft,
    TableConfig, TextConfig, TimeConfig, WidgetConfig, WidgetKind, YAxis, DEFAULT_TABLE_PAGE_SIZE,
    MAX_TABLE_PAGE_SIZE,
};

const MAX_LINE_METRICS: usize = 2;

pub fn normalize(draft: &WidgetDraft) -> WidgetConfig {
    let config = match draft.widget_type {
        WidgetKind::Kpi => WidgetConfig::Kpi(normalize_kpi(draft)),
        WidgetKind::Line => WidgetConfig::Line(normalize_line(draft)),
        WidgetKind::Bar => WidgetConfig::Bar(normalize_categorical(draft)),
        WidgetKind::Column => WidgetConfig::Column(normalize_categorical(draft)),
        WidgetKind::Donut => WidgetConfig::Donut(normalize_categorical(draft)),
        WidgetKind::Table => WidgetConfig::Table(normalize_table(draft)),
        WidgetKind::Text => WidgetConfig::Text(TextConfig {
            style: draft.text_style.clone().unwrap_or_default(),
        }),
        WidgetKind::Dre => WidgetConfig::Dre(normalize_dre(draft)),
    };
    tracing::debug!(widget_type = %draft.widget_type, "widget config normalized");
    config
}

impl From<WidgetDraft> for WidgetConfig {
    fn from(draft: WidgetDraft) -> Self {
        normalize(&draft)
    }
}

/// The metric a KPI draft shows, in order of precedence:
/// 1. the first entry of `metrics`;
/// 2. the inner aggregation of `composite_metric`;
/// 3. nothing.
pub fn effective_kpi_metric(draft: &WidgetDraft) -> Option<Metric> {
    draft.metrics.first().cloned().or_else(|| {
        draft
            .composite_metric
            .as_ref()
            .map(CompositeMetric::inner_metric)
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn clean_metric(metric: &Metric) -> Metric {
    Metric {
        op: metric.op,
        column: non_blank(metric.column.as_deref()),
        alias: non_blank(metric.alias.as_deref()),
        line_y_axis: None,
    }
}

fn clean_metrics(metrics: &[Metric]) -> Vec<Metric> {
    metrics.iter().map(clean_metric).collect()
}

fn clean_dimensions(dimensions: &[Dimension]) -> Vec<Dimension> {
    dimensions
        .iter()
        .filter_map(|dimension| {
            let column = non_blank(Some(dimension.column()))?;
            Some(match dimension {
                Dimension::Column(_) => Dimension::Column(column),
                Dimension::TemporalBucket { granularity, .. } => Dimension::TemporalBucket {
                    column,
                    granularity: *granularity,
                },
            })
        })
        .collect()
}

fn resolve_order_by(order_by: &[OrderByDraft]) -> Vec<OrderBy> {
    order_by.iter().filter_map(OrderByDraft::resolve).collect()
}

/// Blank filter rows are dropped; the editor's `relative` operator becomes
/// `between` over a `{ relative: <preset> }` window, resolved at query time.
pub fn compile_filters(filters: &[Filter]) -> Vec<Filter> {
    filters
        .iter()
        .filter(|f| !f.column.trim().is_empty())
        .map(|filter| {
            let preset = filter.value.as_ref().and_then(FilterValue::relative_preset);
            match (filter.op, preset) {
                (FilterOp::Relative, Some(preset)) => Filter::relative(filter.column.trim(), preset),
                _ => Filter {
                    column: filter.column.trim().to_string(),
                    ..filter.clone()
                },
            }
        })
        .collect()
}

fn normalize_kpi(draft: &WidgetDraft) -> KpiConfig {
    let measure = match &draft.composite_metric {
        Some(composite) => {
            // the editor's metric picker drives the composite's inner side
            let inner = effective_kpi_metric(draft).unwrap_or_else(|| composite.inner_metric());
            KpiMeasure::Composite(CompositeMetric {
                inner_agg: inner.op,
                outer_agg: composite.outer_agg,
                value_column: non_blank(inner.column.as_deref()),
                time_column: composite.time_column.trim().to_string(),
                granularity: composite.granularity,
            })
        }
        None => KpiMeasure::Single(
            effective_kpi_metric(draft)
                .map(|m| clean_metric(&m))
                .unwrap_or_else(Metric::count),
        ),
    };

    KpiConfig {
        measure,
        filters: compile_filters(&draft.filters),
    }
}

fn normalize_line(draft: &WidgetDraft) -> LineConfig {
    let mut metrics: Vec<Metric> = draft
        .metrics
        .iter()
        .take(MAX_LINE_METRICS)
        .enumerate()
        .map(|(index, metric)| {
            let axis = match (index, metric.line_y_axis) {
                (0, _) => YAxis::Left,
                (_, Some(YAxis::Left)) => YAxis::Left,
                (_, _) => YAxis::Right,
            };
            clean_metric(metric).on_axis(axis)
        })
        .collect();
    if metrics.is_empty() {
        metrics.push(Metric::count().on_axis(YAxis::Left));
    }

    let time = draft
        .time
        .as_ref()
        .filter(|t| !t.column.trim().is_empty())
        .map(|t| TimeConfig {
            column: t.column.trim().to_string(),
            granularity: t.granularity,
        });

    let labels = draft.line_labels.clone().unwrap_or_default();
    let labels = LineLabels {
        sensitivity: labels
            .sensitivity
            .clamp(LABEL_SENSITIVITY_MIN, LABEL_SENSITIVITY_MAX),
        window: LABEL_WINDOW,
        min_gap: LABEL_MIN_GAP,
        ..labels
    };

    LineConfig {
        time,
        metrics,
        filters: compile_filters(&draft.filters),
        order_by: resolve_order_by(&draft.order_by),
        labels,
    }
}

fn normalize_categorical(draft: &WidgetDraft) -> CategoricalConfig {
    CategoricalConfig {
        dimensions: clean_dimensions(&draft.dimensions),
        metrics: clean_metrics(&draft.metrics),
        filters: compile_filters(&draft.filters),
        order_by: resolve_order_by(&draft.order_by),
        top_n: draft.top_n.filter(|n| *n > 0),
    }
}

fn normalize_table(draft: &WidgetDraft) -> TableConfig {
    let mut columns: Vec<String> = Vec::new();
    for column in draft.columns.iter().flatten() {
        let column = column.trim();
        if !column.is_empty() && !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    }

    let column_formats: BTreeMap<String, String> = draft
        .table_column_formats
        .iter()
        .flatten()
        .filter(|(column, format)| columns.contains(column) && !format.trim().is_empty())
        .map(|(column, format)| (column.clone(), format.trim().to_string()))
        .collect();

    TableConfig {
        columns,
        metrics: clean_metrics(&draft.metrics),
        dimensions: clean_dimensions(&draft.dimensions),
        filters: compile_filters(&draft.filters),
        order_by: resolve_order_by(&draft.order_by),
        column_formats,
        page_size: draft
            .table_page_size
            .unwrap_or(DEFAULT_TABLE_PAGE_SIZE)
            .clamp(1, MAX_TABLE_PAGE_SIZE),
    }
}

/// Keep a stored index that still points at a result row, otherwise fall
/// back to the first result row. `None` when there is no result row.
pub fn resolve_percent_base(rows: &[DreRow], stored: Option<usize>) -> Option<usize> {
    let is_result = |index: usize| {
        rows.get(index)
            .is_some_and(|row| row.row_type == DreRowType::Result)
    };
    match stored {
        Some(index) if is_result(index) => Some(index),
        _ => rows.iter().position(|row| row.row_type == DreRowType::Result),
    }
}

fn normalize_dre(draft: &WidgetDraft) -> DreConfig {
    let rows: Vec<DreRow> = draft
        .dre_rows
        .iter()
        .flatten()
        .map(|row| DreRow {
            title: row.title.trim().to_string(),
            row_type: row.row_type,
            metrics: clean_metrics(&row.metrics),
        })
        .collect();
    let percent_base_row_index = resolve_percent_base(&rows, draft.dre_percent_base_row_index);

    DreConfig {
        rows,
        percent_base_row_index,
        filters: compile_filters(&draft.filters),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::draft::default_draft_for;
    use crate::domain::schema::{ColumnInfo, ColumnKind};
    use crate::domain::widget::{
        AggOp, LabelMode, RelativePreset, SortDirection, TextStyle, TimeGranularity,
    };
    use proptest::prelude::*;

    fn renormalize(config: &WidgetConfig) -> WidgetConfig {
        normalize(&WidgetDraft::from(config.clone()))
    }

    fn composite(time_column: &str) -> CompositeMetric {
        CompositeMetric {
            inner_agg: AggOp::Count,
            outer_agg: AggOp::Max,
            value_column: None,
            time_column: time_column.to_string(),
            granularity: TimeGranularity::Week,
        }
    }

    #[test]
    fn test_dimension_names_are_trimmed() {
        let mut draft = WidgetDraft::empty(WidgetKind::Bar);
        draft.metrics = vec![Metric::count()];
        draft.dimensions = vec![
            Dimension::Column(" region ".to_string()),
            Dimension::Column("  ".to_string()),
        ];
        match normalize(&draft) {
            WidgetConfig::Bar(bar) => {
                assert_eq!(bar.dimensions, vec![Dimension::Column("region".to_string())])
            }
            other => panic!("unexpected config {other:?}"),
        }

        let mut draft = WidgetDraft::empty(WidgetKind::Table);
        draft.columns = Some(vec!["region".to_string()]);
        draft.dimensions = vec![Dimension::parse("__time_week__: sold_at ")];
        match normalize(&draft) {
            WidgetConfig::Table(table) => assert_eq!(
                table.dimensions,
                vec![Dimension::parse("__time_week__:sold_at")]
            ),
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_kpi_without_composite_writes_one_metric() {
        let mut draft = WidgetDraft::empty(WidgetKind::Kpi);
        draft.metrics = vec![
            Metric::new(AggOp::Sum, Some(" revenue ")),
            Metric::new(AggOp::Avg, Some("revenue")),
        ];
        let config = normalize(&draft);
        match config {
            WidgetConfig::Kpi(KpiConfig {
                measure: KpiMeasure::Single(metric),
                ..
            }) => assert_eq!(metric, Metric::new(AggOp::Sum, Some("revenue"))),
            other => panic!("unexpected config {other:?}"),
        }

        let empty = normalize(&WidgetDraft::empty(WidgetKind::Kpi));
        assert!(matches!(
            empty,
            WidgetConfig::Kpi(KpiConfig { measure: KpiMeasure::Single(ref m), .. }) if *m == Metric::count()
        ));
    }

    #[test]
    fn test_kpi_composite_syncs_inner_from_metric() {
        let mut draft = WidgetDraft::empty(WidgetKind::Kpi);
        draft.metrics = vec![Metric::new(AggOp::Sum, Some("revenue"))];
        draft.composite_metric = Some(composite(" sold_at "));

        let config = normalize(&draft);
        let WidgetConfig::Kpi(KpiConfig {
            measure: KpiMeasure::Composite(composite),
            ..
        }) = &config
        else {
            panic!("expected composite kpi");
        };
        assert_eq!(composite.inner_agg, AggOp::Sum);
        assert_eq!(composite.value_column.as_deref(), Some("revenue"));
        assert_eq!(composite.time_column, "sold_at");
        assert_eq!(
            config.description().as_deref(),
            Some("MAX(SUM(revenue) by week)")
        );

        // the persisted shape carries no plain metrics next to the composite
        let wire = WidgetDraft::from(config.clone());
        assert!(wire.metrics.is_empty());
        assert!(wire.composite_metric.is_some());
        assert_eq!(renormalize(&config), config);
    }

    #[test]
    fn test_kpi_composite_keeps_own_inner_without_metric() {
        let mut draft = WidgetDraft::empty(WidgetKind::Kpi);
        draft.composite_metric = Some(composite("sold_at"));
        let config = normalize(&draft);
        assert_eq!(config.description().as_deref(), Some("MAX(COUNT(*) by week)"));
    }

    #[test]
    fn test_line_truncates_and_assigns_axes() {
        let mut draft = WidgetDraft::empty(WidgetKind::Line);
        draft.metrics = vec![
            Metric::count().on_axis(YAxis::Right),
            Metric::new(AggOp::Sum, Some("revenue")),
            Metric::new(AggOp::Avg, Some("revenue")),
        ];
        let WidgetConfig::Line(line) = normalize(&draft) else {
            panic!("expected line");
        };
        assert_eq!(line.metrics.len(), 2);
        assert_eq!(line.metrics[0].line_y_axis, Some(YAxis::Left));
        assert_eq!(line.metrics[1].line_y_axis, Some(YAxis::Right));

        draft.metrics = vec![
            Metric::count(),
            Metric::new(AggOp::Sum, Some("revenue")).on_axis(YAxis::Left),
        ];
        let WidgetConfig::Line(line) = normalize(&draft) else {
            panic!("expected line");
        };
        assert_eq!(line.metrics[1].line_y_axis, Some(YAxis::Left));
    }

    #[test]
    fn test_line_label_settings_are_forced() {
        let mut draft = WidgetDraft::empty(WidgetKind::Line);
        draft.line_labels = Some(LineLabels {
            enabled: true,
            mode: LabelMode::Valleys,
            sensitivity: 3,
            window: 7,
            min_gap: 9,
        });
        let WidgetConfig::Line(line) = normalize(&draft) else {
            panic!("expected line");
        };
        assert_eq!(line.labels.sensitivity, LABEL_SENSITIVITY_MIN);
        assert_eq!(line.labels.window, 3);
        assert_eq!(line.labels.min_gap, 2);
        assert_eq!(line.labels.mode, LabelMode::Valleys);
        assert_eq!(line.metrics, vec![Metric::count().on_axis(YAxis::Left)]);
    }

    #[test]
    fn test_categorical_strips_time_and_columns() {
        let mut draft = WidgetDraft::empty(WidgetKind::Bar);
        draft.metrics = vec![Metric::count().on_axis(YAxis::Right)];
        draft.dimensions = vec![Dimension::parse("region"), Dimension::parse(" ")];
        draft.time = Some(TimeConfig {
            column: "sold_at".to_string(),
            granularity: TimeGranularity::Day,
        });
        draft.columns = Some(vec!["region".to_string()]);
        draft.top_n = Some(0);
        draft.order_by = vec![
            OrderByDraft::default(),
            OrderByDraft {
                metric_ref: Some("m0".to_string()),
                direction: SortDirection::Desc,
                ..Default::default()
            },
        ];

        let config = normalize(&draft);
        let wire = WidgetDraft::from(config.clone());
        assert!(wire.time.is_none());
        assert!(wire.columns.is_none());
        assert!(wire.top_n.is_none());
        assert_eq!(wire.dimensions, vec![Dimension::parse("region")]);
        assert_eq!(wire.order_by.len(), 1);
        assert_eq!(wire.metrics[0].line_y_axis, None);
    }

    #[test]
    fn test_table_cleans_columns_and_formats() {
        let mut draft = WidgetDraft::empty(WidgetKind::Table);
        draft.columns = Some(vec![
            "region".to_string(),
            "revenue".to_string(),
            "region".to_string(),
            "".to_string(),
        ]);
        draft.table_column_formats = Some(BTreeMap::from([
            ("revenue".to_string(), "currency".to_string()),
            ("sold_at".to_string(), "date".to_string()),
        ]));
        draft.table_page_size = Some(10_000);
        draft.top_n = Some(10);

        let WidgetConfig::Table(table) = normalize(&draft) else {
            panic!("expected table");
        };
        assert_eq!(table.columns, vec!["region", "revenue"]);
        assert_eq!(
            table.column_formats,
            BTreeMap::from([("revenue".to_string(), "currency".to_string())])
        );
        assert_eq!(table.page_size, MAX_TABLE_PAGE_SIZE);
    }

    #[test]
    fn test_dre_percent_base_moves_to_result_row() {
        let rows = vec![
            DreRow::new("Revenue", DreRowType::Result, vec![Metric::count()]),
            DreRow::new("Taxes", DreRowType::Deduction, vec![Metric::count()]),
        ];
        let mut draft = WidgetDraft::empty(WidgetKind::Dre);
        draft.dre_rows = Some(rows.clone());
        draft.dre_percent_base_row_index = Some(1);
        draft.metrics = vec![Metric::count()];

        let config = normalize(&draft);
        let WidgetConfig::Dre(dre) = &config else {
            panic!("expected dre");
        };
        assert_eq!(dre.percent_base_row_index, Some(0));
        assert!(WidgetDraft::from(config.clone()).metrics.is_empty());

        assert_eq!(resolve_percent_base(&rows, Some(0)), Some(0));
        assert_eq!(resolve_percent_base(&rows, Some(7)), Some(0));
        assert_eq!(resolve_percent_base(&rows[1..], Some(0)), None);
    }

    #[test]
    fn test_relative_filter_compiles_to_between() {
        let mut draft = WidgetDraft::empty(WidgetKind::Kpi);
        draft.filters = vec![
            Filter::new(
                "sold_at",
                FilterOp::Relative,
                Some(FilterValue::Scalar(serde_json::json!("last_30_days"))),
            ),
            Filter::new("  ", FilterOp::Eq, None),
        ];
        let config = normalize(&draft);
        assert_eq!(
            config.filters(),
            &[Filter::relative("sold_at", RelativePreset::Last30Days)]
        );
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json["filters"][0],
            serde_json::json!({"column": "sold_at", "op": "between", "value": {"relative": "last_30_days"}})
        );
    }

    #[test]
    fn test_text_keeps_only_style() {
        let mut draft = WidgetDraft::empty(WidgetKind::Text);
        draft.metrics = vec![Metric::count()];
        draft.filters = vec![Filter::new("region", FilterOp::Eq, None)];
        draft.text_style = Some(TextStyle {
            content: "Quarterly notes".to_string(),
            ..TextStyle::default()
        });
        let wire = serde_json::to_value(normalize(&draft)).unwrap();
        assert_eq!(wire["widget_type"], "text");
        assert_eq!(wire["metrics"], serde_json::json!([]));
        assert_eq!(wire["filters"], serde_json::json!([]));
        assert_eq!(wire["text_style"]["content"], "Quarterly notes");
    }

    #[test]
    fn test_deserializing_config_compiles_it() {
        let config: WidgetConfig = serde_json::from_str(
            r#"{"widget_type":"line","metrics":[{"op":"count"},{"op":"sum","column":"revenue"},{"op":"max","column":"revenue"}],"time":{"column":"sold_at","granularity":"month"}}"#,
        )
        .unwrap();
        let WidgetConfig::Line(line) = config else {
            panic!("expected line");
        };
        assert_eq!(line.metrics.len(), 2);
    }

    #[test]
    fn test_defaults_are_fixed_points() {
        let columns = vec![
            ColumnInfo::new("region", ColumnKind::Text),
            ColumnInfo::new("sold_at", ColumnKind::Temporal),
        ];
        for kind in WidgetKind::ALL {
            let config = normalize(&default_draft_for(kind, &columns));
            assert_eq!(renormalize(&config), config, "{kind}");
        }
    }

    fn arb_metric() -> impl Strategy<Value = Metric> {
        (
            prop::sample::select(vec![
                AggOp::Count,
                AggOp::DistinctCount,
                AggOp::Sum,
                AggOp::Avg,
                AggOp::Min,
                AggOp::Max,
            ]),
            prop::option::of(prop::sample::select(vec!["", " revenue", "region", "sold_at"])),
            prop::option::of(prop::sample::select(vec![YAxis::Left, YAxis::Right])),
        )
            .prop_map(|(op, column, axis)| Metric {
                op,
                column: column.map(str::to_string),
                alias: None,
                line_y_axis: axis,
            })
    }

    fn arb_row() -> impl Strategy<Value = DreRow> {
        (
            prop::sample::select(vec![
                DreRowType::Result,
                DreRowType::Deduction,
                DreRowType::Detail,
            ]),
            prop::collection::vec(arb_metric(), 0..3),
        )
            .prop_map(|(row_type, metrics)| DreRow::new(" row ", row_type, metrics))
    }

    fn arb_draft() -> impl Strategy<Value = WidgetDraft> {
        (
            prop::sample::select(WidgetKind::ALL.to_vec()),
            prop::collection::vec(arb_metric(), 0..4),
            prop::collection::vec(
                prop::sample::select(vec!["region", "__time_month__:sold_at", "", "revenue"]),
                0..3,
            ),
            prop::option::of(Just(composite("sold_at"))),
            prop::option::of(prop::collection::vec(arb_row(), 0..4)),
            prop::option::of(0usize..5),
            prop::option::of(0u8..=120),
            prop::option::of(0u32..1000),
        )
            .prop_map(
                |(kind, metrics, dims, composite, rows, base, sensitivity, page)| {
                    let mut draft = WidgetDraft::empty(kind);
                    draft.metrics = metrics;
                    draft.dimensions = dims.into_iter().map(Dimension::parse).collect();
                    draft.composite_metric = composite;
                    draft.dre_rows = rows;
                    draft.dre_percent_base_row_index = base;
                    draft.line_labels = sensitivity.map(|s| LineLabels {
                        sensitivity: s,
                        ..LineLabels::default()
                    });
                    draft.table_page_size = page;
                    draft.columns = Some(vec!["region".to_string(), " sold_at".to_string()]);
                    draft.top_n = page;
                    draft
                },
            )
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(draft in arb_draft()) {
            let once = normalize(&draft);
            prop_assert_eq!(renormalize(&once), once);
        }

        #[test]
        fn kpi_has_exactly_one_measure(draft in arb_draft()) {
            let mut draft = draft;
            draft.widget_type = WidgetKind::Kpi;
            let wire = WidgetDraft::from(normalize(&draft));
            prop_assert!(wire.metrics.len() == 1 || wire.composite_metric.is_some());
            prop_assert!(!(wire.metrics.len() == 1 && wire.composite_metric.is_some()));
        }

        #[test]
        fn line_metric_bounds(draft in arb_draft()) {
            let mut draft = draft;
            draft.widget_type = WidgetKind::Line;
            let WidgetConfig::Line(line) = normalize(&draft) else {
                unreachable!("line draft compiles to line config");
            };
            prop_assert!((1..=2).contains(&line.metrics.len()));
            prop_assert_eq!(line.metrics[0].line_y_axis, Some(YAxis::Left));
        }

        #[test]
        fn dre_base_points_at_result_row(draft in arb_draft()) {
            let mut draft = draft;
            draft.widget_type = WidgetKind::Dre;
            let WidgetConfig::Dre(dre) = normalize(&draft) else {
                unreachable!("dre draft compiles to dre config");
            };
            let has_result = dre.rows.iter().any(|r| r.row_type == DreRowType::Result);
            match dre.percent_base_row_index {
                Some(index) => prop_assert_eq!(dre.rows[index].row_type, DreRowType::Result),
                None => prop_assert!(!has_result),
            }
        }
    }
}
