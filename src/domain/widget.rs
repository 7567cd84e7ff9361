// Widget configuration domain model
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::draft::WidgetDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Kpi,
    Line,
    Bar,
    Column,
    Donut,
    Table,
    Text,
    Dre,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 8] = [
        WidgetKind::Kpi,
        WidgetKind::Line,
        WidgetKind::Bar,
        WidgetKind::Column,
        WidgetKind::Donut,
        WidgetKind::Table,
        WidgetKind::Text,
        WidgetKind::Dre,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Kpi => "kpi",
            WidgetKind::Line => "line",
            WidgetKind::Bar => "bar",
            WidgetKind::Column => "column",
            WidgetKind::Donut => "donut",
            WidgetKind::Table => "table",
            WidgetKind::Text => "text",
            WidgetKind::Dre => "dre",
        }
    }

    /// Bar, column and donut share one categorical configuration shape.
    pub fn is_categorical_chart(&self) -> bool {
        matches!(self, WidgetKind::Bar | WidgetKind::Column | WidgetKind::Donut)
    }

    /// Only bar and column charts may group by a temporal bucket.
    pub fn allows_temporal_bucket(&self) -> bool {
        matches!(self, WidgetKind::Bar | WidgetKind::Column)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggOp {
    Count,
    DistinctCount,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggOp {
    /// sum/avg/min/max only make sense over numeric columns
    pub fn requires_numeric(&self) -> bool {
        matches!(self, AggOp::Sum | AggOp::Avg | AggOp::Min | AggOp::Max)
    }

    /// Everything except `count` needs a column; `count` without one is `count(*)`.
    pub fn requires_column(&self) -> bool {
        !matches!(self, AggOp::Count)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AggOp::Count => "COUNT",
            AggOp::DistinctCount => "DISTINCT_COUNT",
            AggOp::Sum => "SUM",
            AggOp::Avg => "AVG",
            AggOp::Min => "MIN",
            AggOp::Max => "MAX",
        }
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YAxis {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub op: AggOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_y_axis: Option<YAxis>,
}

impl Metric {
    pub fn new(op: AggOp, column: Option<&str>) -> Self {
        Self {
            op,
            column: column.map(str::to_string),
            alias: None,
            line_y_axis: None,
        }
    }

    /// `count(*)`, the default metric for fresh widgets
    pub fn count() -> Self {
        Self::new(AggOp::Count, None)
    }

    pub fn on_axis(mut self, axis: YAxis) -> Self {
        self.line_y_axis = Some(axis);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGranularity {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl TimeGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeGranularity::Hour => "hour",
            TimeGranularity::Day => "day",
            TimeGranularity::Week => "week",
            TimeGranularity::Month => "month",
        }
    }
}

/// Outer aggregation over a per-time-bucket inner aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeMetric {
    pub inner_agg: AggOp,
    pub outer_agg: AggOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_column: Option<String>,
    #[serde(default)]
    pub time_column: String,
    #[serde(default)]
    pub granularity: TimeGranularity,
}

impl CompositeMetric {
    /// Human readable form, e.g. `AVG(SUM(revenue) by month)`.
    pub fn describe(&self) -> String {
        format!(
            "{}({}({}) by {})",
            self.outer_agg.label(),
            self.inner_agg.label(),
            self.value_column.as_deref().unwrap_or("*"),
            self.granularity.as_str()
        )
    }

    /// The inner aggregation viewed as a plain metric.
    pub fn inner_metric(&self) -> Metric {
        Metric::new(self.inner_agg, self.value_column.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeConfig {
    pub column: String,
    #[serde(default)]
    pub granularity: TimeGranularity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    Between,
    In,
    NotIn,
    IsNull,
    NotNull,
    /// Editor-only operator; compiled to `between` with a relative window.
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelativePreset {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "yesterday")]
    Yesterday,
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "last_month")]
    LastMonth,
    #[serde(rename = "this_year")]
    ThisYear,
}

impl RelativePreset {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "today" => Some(RelativePreset::Today),
            "yesterday" => Some(RelativePreset::Yesterday),
            "last_7_days" => Some(RelativePreset::Last7Days),
            "last_30_days" => Some(RelativePreset::Last30Days),
            "this_month" => Some(RelativePreset::ThisMonth),
            "last_month" => Some(RelativePreset::LastMonth),
            "this_year" => Some(RelativePreset::ThisYear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Rolling window resolved server-side at query time
    Relative { relative: RelativePreset },
    Scalar(serde_json::Value),
}

impl FilterValue {
    pub fn relative_preset(&self) -> Option<RelativePreset> {
        match self {
            FilterValue::Relative { relative } => Some(*relative),
            FilterValue::Scalar(serde_json::Value::String(s)) => RelativePreset::parse(s),
            FilterValue::Scalar(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl Filter {
    pub fn new(column: &str, op: FilterOp, value: Option<FilterValue>) -> Self {
        Self {
            column: column.to_string(),
            op,
            value,
        }
    }

    pub fn relative(column: &str, preset: RelativePreset) -> Self {
        Self::new(
            column,
            FilterOp::Between,
            Some(FilterValue::Relative { relative: preset }),
        )
    }

    pub fn is_relative(&self) -> bool {
        matches!(self.value, Some(FilterValue::Relative { .. }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTarget {
    Column(String),
    MetricRef(String),
}

/// Order-by entry as it travels on the wire: exactly one of `column` and
/// `metric_ref` is expected, but editing drafts may carry either, both or none.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderByDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_ref: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderByDraft {
    /// `metric_ref` wins when both are set; blank entries resolve to nothing.
    pub fn resolve(&self) -> Option<OrderBy> {
        let non_blank = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let target = match (non_blank(&self.metric_ref), non_blank(&self.column)) {
            (Some(metric_ref), _) => OrderTarget::MetricRef(metric_ref),
            (None, Some(column)) => OrderTarget::Column(column),
            (None, None) => return None,
        };
        Some(OrderBy {
            target,
            direction: self.direction,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "OrderByDraft", try_from = "OrderByDraft")]
pub struct OrderBy {
    pub target: OrderTarget,
    pub direction: SortDirection,
}

impl From<OrderBy> for OrderByDraft {
    fn from(order: OrderBy) -> Self {
        let (column, metric_ref) = match order.target {
            OrderTarget::Column(c) => (Some(c), None),
            OrderTarget::MetricRef(m) => (None, Some(m)),
        };
        OrderByDraft {
            column,
            metric_ref,
            direction: order.direction,
        }
    }
}

impl TryFrom<OrderByDraft> for OrderBy {
    type Error = String;

    fn try_from(draft: OrderByDraft) -> Result<Self, Self::Error> {
        draft
            .resolve()
            .ok_or_else(|| "order_by entry needs either `column` or `metric_ref`".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketGranularity {
    Month,
    Week,
    Weekday,
    Hour,
}

impl BucketGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketGranularity::Month => "month",
            BucketGranularity::Week => "week",
            BucketGranularity::Weekday => "weekday",
            BucketGranularity::Hour => "hour",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "month" => Some(BucketGranularity::Month),
            "week" => Some(BucketGranularity::Week),
            "weekday" => Some(BucketGranularity::Weekday),
            "hour" => Some(BucketGranularity::Hour),
            _ => None,
        }
    }
}

const BUCKET_PREFIX: &str = "__time_";
const BUCKET_SEPARATOR: &str = "__:";

/// A grouping dimension. On the wire a temporal bucket is encoded as the
/// sentinel string `__time_<granularity>__:<column>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Dimension {
    Column(String),
    TemporalBucket {
        column: String,
        granularity: BucketGranularity,
    },
}

impl Dimension {
    /// Unrecognised sentinels fall back to a plain column name.
    pub fn parse(raw: &str) -> Self {
        let bucket = raw
            .strip_prefix(BUCKET_PREFIX)
            .and_then(|rest| rest.split_once(BUCKET_SEPARATOR))
            .and_then(|(granularity, column)| {
                let granularity = BucketGranularity::parse(granularity)?;
                (!column.is_empty()).then(|| Dimension::TemporalBucket {
                    column: column.to_string(),
                    granularity,
                })
            });
        bucket.unwrap_or_else(|| Dimension::Column(raw.to_string()))
    }

    pub fn encode(&self) -> String {
        match self {
            Dimension::Column(column) => column.clone(),
            Dimension::TemporalBucket {
                column,
                granularity,
            } => format!(
                "{}{}{}{}",
                BUCKET_PREFIX,
                granularity.as_str(),
                BUCKET_SEPARATOR,
                column
            ),
        }
    }

    /// The underlying view column.
    pub fn column(&self) -> &str {
        match self {
            Dimension::Column(column) => column,
            Dimension::TemporalBucket { column, .. } => column,
        }
    }
}

impl From<String> for Dimension {
    fn from(raw: String) -> Self {
        Dimension::parse(&raw)
    }
}

impl From<Dimension> for String {
    fn from(dimension: Dimension) -> Self {
        dimension.encode()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DreRowType {
    Result,
    Deduction,
    Detail,
}

impl DreRowType {
    /// Statement level shown next to the row title.
    pub fn level(&self) -> &'static str {
        match self {
            DreRowType::Result => "N1",
            DreRowType::Deduction => "N2",
            DreRowType::Detail => "N3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreRow {
    pub title: String,
    pub row_type: DreRowType,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl DreRow {
    pub fn new(title: &str, row_type: DreRowType, metrics: Vec<Metric>) -> Self {
        Self {
            title: title.to_string(),
            row_type,
            metrics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

pub const DEFAULT_FONT_SIZE: u16 = 16;

fn default_font_size() -> u16 {
    DEFAULT_FONT_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_font_size")]
    pub font_size: u16,
    #[serde(default)]
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_size: DEFAULT_FONT_SIZE,
            align: TextAlign::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelMode {
    #[default]
    Both,
    Peaks,
    Valleys,
}

pub const LABEL_SENSITIVITY_MIN: u8 = 25;
pub const LABEL_SENSITIVITY_MAX: u8 = 100;
pub const LABEL_WINDOW: u8 = 3;
pub const LABEL_MIN_GAP: u8 = 2;

/// Data-label placement for line charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineLabels {
    pub enabled: bool,
    pub mode: LabelMode,
    pub sensitivity: u8,
    pub window: u8,
    pub min_gap: u8,
}

impl Default for LineLabels {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: LabelMode::Both,
            sensitivity: 50,
            window: LABEL_WINDOW,
            min_gap: LABEL_MIN_GAP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetHeight {
    Half,
    #[default]
    Full,
}

impl From<WidgetHeight> for f64 {
    fn from(height: WidgetHeight) -> Self {
        match height {
            WidgetHeight::Half => 0.5,
            WidgetHeight::Full => 1.0,
        }
    }
}

impl From<f64> for WidgetHeight {
    /// Anything under a full row snaps to half height.
    fn from(raw: f64) -> Self {
        if raw < 1.0 {
            WidgetHeight::Half
        } else {
            WidgetHeight::Full
        }
    }
}

impl Serialize for WidgetHeight {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(f64::from(*self))
    }
}

impl<'de> Deserialize<'de> for WidgetHeight {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(WidgetHeight::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawWidgetSize")]
pub struct WidgetSize {
    pub width: u8,
    pub height: WidgetHeight,
}

/// Unchecked wire form; widths outside `1..=4` are clamped on the way in.
#[derive(Deserialize)]
struct RawWidgetSize {
    width: u8,
    #[serde(default)]
    height: WidgetHeight,
}

impl From<RawWidgetSize> for WidgetSize {
    fn from(raw: RawWidgetSize) -> Self {
        WidgetSize::new(raw.width, raw.height)
    }
}

impl WidgetSize {
    pub fn new(width: u8, height: WidgetHeight) -> Self {
        Self {
            width: width.clamp(1, 4),
            height,
        }
    }
}

impl Default for WidgetSize {
    fn default() -> Self {
        Self::new(1, WidgetHeight::Full)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KpiMeasure {
    Single(Metric),
    Composite(CompositeMetric),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiConfig {
    pub measure: KpiMeasure,
    pub filters: Vec<Filter>,
}

impl KpiConfig {
    /// The single metric a KPI displays: the plain metric, or the inner
    /// aggregation of a composite.
    pub fn effective_metric(&self) -> Metric {
        match &self.measure {
            KpiMeasure::Single(metric) => metric.clone(),
            KpiMeasure::Composite(composite) => composite.inner_metric(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineConfig {
    pub time: Option<TimeConfig>,
    pub metrics: Vec<Metric>,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub labels: LineLabels,
}

/// Shared by bar, column and donut charts.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalConfig {
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<Metric>,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub top_n: Option<u32>,
}

pub const DEFAULT_TABLE_PAGE_SIZE: u32 = 25;
pub const MAX_TABLE_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    pub columns: Vec<String>,
    pub metrics: Vec<Metric>,
    pub dimensions: Vec<Dimension>,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub column_formats: BTreeMap<String, String>,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextConfig {
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DreConfig {
    pub rows: Vec<DreRow>,
    pub percent_base_row_index: Option<usize>,
    pub filters: Vec<Filter>,
}

/// Canonical, persistable widget configuration. Fields that mean nothing for
/// a kind do not exist on its variant. Serialized through the flat
/// [`WidgetDraft`] wire shape; deserializing compiles the draft again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WidgetDraft", from = "WidgetDraft")]
pub enum WidgetConfig {
    Kpi(KpiConfig),
    Line(LineConfig),
    Bar(CategoricalConfig),
    Column(CategoricalConfig),
    Donut(CategoricalConfig),
    Table(TableConfig),
    Text(TextConfig),
    Dre(DreConfig),
}

impl WidgetConfig {
    pub fn kind(&self) -> WidgetKind {
        match self {
            WidgetConfig::Kpi(_) => WidgetKind::Kpi,
            WidgetConfig::Line(_) => WidgetKind::Line,
            WidgetConfig::Bar(_) => WidgetKind::Bar,
            WidgetConfig::Column(_) => WidgetKind::Column,
            WidgetConfig::Donut(_) => WidgetKind::Donut,
            WidgetConfig::Table(_) => WidgetKind::Table,
            WidgetConfig::Text(_) => WidgetKind::Text,
            WidgetConfig::Dre(_) => WidgetKind::Dre,
        }
    }

    pub fn filters(&self) -> &[Filter] {
        match self {
            WidgetConfig::Kpi(c) => &c.filters,
            WidgetConfig::Line(c) => &c.filters,
            WidgetConfig::Bar(c) | WidgetConfig::Column(c) | WidgetConfig::Donut(c) => &c.filters,
            WidgetConfig::Table(c) => &c.filters,
            WidgetConfig::Text(_) => &[],
            WidgetConfig::Dre(c) => &c.filters,
        }
    }

    /// Composite description for KPI widgets backed by a composite metric.
    pub fn description(&self) -> Option<String> {
        match self {
            WidgetConfig::Kpi(KpiConfig {
                measure: KpiMeasure::Composite(composite),
                ..
            }) => Some(composite.describe()),
            _ => None,
        }
    }
}
