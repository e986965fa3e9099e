use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    MetricCard,
    LineChart,
    BarChart,
    PieChart,
    RevenueMetric,
    DataTable,
}

impl WidgetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MetricCard => "metric_card",
            Self::LineChart => "line_chart",
            Self::BarChart => "bar_chart",
            Self::PieChart => "pie_chart",
            Self::RevenueMetric => "revenue_metric",
            Self::DataTable => "data_table",
        }
    }

    /// Instances carry the type as a raw string so dashboards saved by a newer
    /// app version degrade to the unknown-widget notice instead of failing to
    /// deserialize.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "metric_card" => Some(Self::MetricCard),
            "line_chart" => Some(Self::LineChart),
            "bar_chart" => Some(Self::BarChart),
            "pie_chart" => Some(Self::PieChart),
            "revenue_metric" => Some(Self::RevenueMetric),
            "data_table" => Some(Self::DataTable),
            _ => None,
        }
    }

    pub fn all() -> [Self; 6] {
        [
            Self::MetricCard,
            Self::LineChart,
            Self::BarChart,
            Self::PieChart,
            Self::RevenueMetric,
            Self::DataTable,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetTypeDescriptor {
    pub widget_type: WidgetType,
    pub category: String,
    pub name: String,
    pub description: String,
    pub default_config: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    TableQuery,
    CustomQuery,
    Calculated,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TableQuery => "table_query",
            Self::CustomQuery => "custom_query",
            Self::Calculated => "calculated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOperation {
    Select,
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    pub table: String,
    pub operation: TableOperation,
    /// Column list; `["*"]` selects every column.
    pub columns: Vec<String>,
    pub filters: Vec<QueryFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryConfig {
    TableQuery(TableQuery),
    CustomQuery { query: String },
    Calculated { metric: Option<String> },
}

impl QueryConfig {
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::TableQuery(_) => SourceType::TableQuery,
            Self::CustomQuery { .. } => SourceType::CustomQuery,
            Self::Calculated { .. } => SourceType::Calculated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDescriptor {
    pub id: String,
    pub name: String,
    pub source_type: SourceType,
    pub query_config: QueryConfig,
    pub refresh_interval_seconds: i64,
    pub cache_duration_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDataSourcePayload {
    pub name: String,
    pub query_config: QueryConfig,
    pub refresh_interval_seconds: Option<i64>,
    pub cache_duration_seconds: Option<i64>,
}

// ─── Dashboards ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInstance {
    pub id: String,
    pub widget_type: String,
    /// Empty string when no data source has been bound yet.
    pub data_source_id: String,
    pub config: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub columns: u32,
    pub row_height: u32,
    pub margin: [u32; 2],
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: 4,
            row_height: 150,
            margin: [16, 16],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    pub user_id: String,
    pub dashboard_name: String,
    pub layout_config: LayoutConfig,
    pub widget_configs: Vec<WidgetInstance>,
    pub filters: Map<String, Value>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfigRecord {
    pub id: String,
    pub user_id: String,
    pub dashboard_name: String,
    pub layout_config: LayoutConfig,
    pub widget_configs: Vec<WidgetInstance>,
    pub filters: Map<String, Value>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-widget fetch state surfaced to the shell: skeleton while loading, the
/// inline error message on failure, data otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDataState {
    pub data: Option<Value>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl WidgetDataState {
    pub fn loading() -> Self {
        Self {
            data: None,
            is_loading: true,
            error: None,
        }
    }

    pub fn ready(data: Value) -> Self {
        Self {
            data: Some(data),
            is_loading: false,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: None,
            is_loading: false,
            error: Some(message.into()),
        }
    }
}
