use crate::catalog::display_name;
use crate::models::{WidgetInstance, WidgetType, WidgetTypeDescriptor};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Shallow key-by-key merge; overrides win, unrelated keys are preserved.
/// Explicit nulls are written through: a null is a user "clear" and resolves
/// back to the widget type's default, while an absent key keeps the existing
/// value.
pub fn merge_config(existing: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = existing.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Config surface shown when the configuration dialog opens:
/// `defaultConfig ⊕ priorConfig ⊕ {data_source_id fallback}`, last write wins.
/// The fallback only fills in when the instance has no source bound yet.
pub fn dialog_config(
    descriptor: &WidgetTypeDescriptor,
    instance: &WidgetInstance,
    fallback_source_id: Option<&str>,
) -> Map<String, Value> {
    let mut merged = merge_config(&descriptor.default_config, &instance.config);
    let bound = merged
        .get("data_source_id")
        .and_then(Value::as_str)
        .map(|id| !id.is_empty())
        .unwrap_or(false)
        || !instance.data_source_id.is_empty();
    if !bound {
        if let Some(source_id) = fallback_source_id {
            merged.insert("data_source_id".to_string(), json!(source_id));
        }
    }
    merged
}

// ─── Typed per-widget configs ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricKind {
    #[default]
    Count,
    Sum,
    Average,
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueFormat {
    #[default]
    Number,
    Currency,
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevenueKind {
    #[default]
    Mrr,
    Arr,
    ChurnRate,
    Ltv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrencyCode {
    #[default]
    Usd,
    Eur,
    Gbp,
    Jpy,
}

impl CurrencyCode {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Eur => "€",
            Self::Gbp => "£",
            Self::Jpy => "¥",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricCardConfig {
    pub metric_type: MetricKind,
    pub format: ValueFormat,
    pub trend_comparison: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisConfig {
    pub x_axis: String,
    pub y_axis: String,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            x_axis: "name".to_string(),
            y_axis: "value".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PieChartConfig {
    pub axes: AxisConfig,
    pub data_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RevenueMetricConfig {
    pub metric_type: RevenueKind,
    pub currency: CurrencyCode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTableConfig {
    pub columns: Option<Vec<String>>,
    pub page_size: usize,
}

impl Default for DataTableConfig {
    fn default() -> Self {
        Self {
            columns: None,
            page_size: 10,
        }
    }
}

/// Closed sum type over widget kinds; the render dispatcher matches this
/// exhaustively, so a new widget type cannot be added without a renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetConfig {
    MetricCard(MetricCardConfig),
    LineChart(AxisConfig),
    BarChart(AxisConfig),
    PieChart(PieChartConfig),
    RevenueMetric(RevenueMetricConfig),
    DataTable(DataTableConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWidget {
    pub widget_type: WidgetType,
    pub title: String,
    pub config: WidgetConfig,
}

/// Produces the typed config for a widget, coercing lenient inputs (numeric
/// strings, comma-separated column lists) and falling back to declared
/// defaults for invalid values. Returns `None` for an unrecognized type so the
/// caller can render the unknown-widget notice.
pub fn resolve_config(widget_type: &str, config: &Map<String, Value>) -> Option<ResolvedWidget> {
    let parsed = WidgetType::parse(widget_type)?;
    let title = string_field(config, "title")
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| display_name(parsed).to_string());

    let typed = match parsed {
        WidgetType::MetricCard => WidgetConfig::MetricCard(MetricCardConfig {
            metric_type: match string_field(config, "metric_type").as_deref() {
                Some("sum") => MetricKind::Sum,
                Some("average") => MetricKind::Average,
                Some("percentage") => MetricKind::Percentage,
                _ => MetricKind::Count,
            },
            format: match string_field(config, "format").as_deref() {
                Some("currency") => ValueFormat::Currency,
                Some("percentage") => ValueFormat::Percentage,
                _ => ValueFormat::Number,
            },
            trend_comparison: bool_field(config, "trend_comparison"),
        }),
        WidgetType::LineChart => WidgetConfig::LineChart(axis_config(config)),
        WidgetType::BarChart => WidgetConfig::BarChart(axis_config(config)),
        WidgetType::PieChart => WidgetConfig::PieChart(PieChartConfig {
            axes: axis_config(config),
            data_column: string_field(config, "data_column").filter(|column| !column.is_empty()),
        }),
        WidgetType::RevenueMetric => WidgetConfig::RevenueMetric(RevenueMetricConfig {
            metric_type: match string_field(config, "metric_type").as_deref() {
                Some("arr") => RevenueKind::Arr,
                Some("churn_rate") => RevenueKind::ChurnRate,
                Some("ltv") => RevenueKind::Ltv,
                _ => RevenueKind::Mrr,
            },
            currency: match string_field(config, "currency").as_deref() {
                Some("EUR") => CurrencyCode::Eur,
                Some("GBP") => CurrencyCode::Gbp,
                Some("JPY") => CurrencyCode::Jpy,
                _ => CurrencyCode::Usd,
            },
        }),
        WidgetType::DataTable => WidgetConfig::DataTable(DataTableConfig {
            columns: columns_field(config),
            page_size: page_size_field(config),
        }),
    };

    Some(ResolvedWidget {
        widget_type: parsed,
        title,
        config: typed,
    })
}

fn string_field(config: &Map<String, Value>, key: &str) -> Option<String> {
    config.get(key).and_then(Value::as_str).map(ToString::to_string)
}

fn bool_field(config: &Map<String, Value>, key: &str) -> bool {
    match config.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(raw)) => raw == "true",
        _ => false,
    }
}

fn axis_config(config: &Map<String, Value>) -> AxisConfig {
    let defaults = AxisConfig::default();
    AxisConfig {
        x_axis: string_field(config, "x_axis")
            .filter(|axis| !axis.is_empty())
            .unwrap_or(defaults.x_axis),
        y_axis: string_field(config, "y_axis")
            .filter(|axis| !axis.is_empty())
            .unwrap_or(defaults.y_axis),
    }
}

/// Columns come from the dialog as a comma-separated string; saved configs may
/// already hold an array. Entries are trimmed and empties dropped either way.
fn columns_field(config: &Map<String, Value>) -> Option<Vec<String>> {
    let columns = match config.get("columns") {
        Some(Value::String(raw)) => raw
            .split(',')
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(ToString::to_string)
            .collect(),
        _ => return None,
    };
    if columns.is_empty() {
        None
    } else {
        Some(columns)
    }
}

fn page_size_field(config: &Map<String, Value>) -> usize {
    config
        .get("page_size")
        .and_then(coerce_number)
        .map(|size| (size as i64).clamp(1, 100) as usize)
        .unwrap_or(10)
}

/// Lenient numeric coercion: numbers pass through, numeric strings parse,
/// everything else is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// ─── Validation ─────────────────────────────────────────────────────────────

static FIELD_SCHEMAS: Lazy<HashMap<WidgetType, Value>> = Lazy::new(|| {
    let common = json!({
        "title": { "type": "string" },
        "data_source_id": { "type": "string" }
    });
    let mut schemas = HashMap::new();
    schemas.insert(
        WidgetType::MetricCard,
        object_schema(&common, json!({
            "metric_type": { "enum": ["count", "sum", "average", "percentage"] },
            "format": { "enum": ["number", "currency", "percentage"] },
            "trend_comparison": { "type": "boolean" }
        })),
    );
    let axes = json!({
        "x_axis": { "type": "string" },
        "y_axis": { "type": "string" }
    });
    schemas.insert(WidgetType::LineChart, object_schema(&common, axes.clone()));
    schemas.insert(WidgetType::BarChart, object_schema(&common, axes.clone()));
    schemas.insert(
        WidgetType::PieChart,
        object_schema(&common, json!({
            "x_axis": { "type": "string" },
            "y_axis": { "type": "string" },
            "data_column": { "type": "string" }
        })),
    );
    schemas.insert(
        WidgetType::RevenueMetric,
        object_schema(&common, json!({
            "metric_type": { "enum": ["mrr", "arr", "churn_rate", "ltv"] },
            "currency": { "enum": ["USD", "EUR", "GBP", "JPY"] }
        })),
    );
    schemas.insert(
        WidgetType::DataTable,
        object_schema(&common, json!({
            "columns": {
                "anyOf": [
                    { "type": "string" },
                    { "type": "array", "items": { "type": "string" } }
                ]
            },
            "page_size": { "type": "integer", "minimum": 1, "maximum": 100 }
        })),
    );
    schemas
});

fn object_schema(common: &Value, properties: Value) -> Value {
    let mut merged = common.as_object().cloned().unwrap_or_default();
    if let Value::Object(extra) = properties {
        merged.extend(extra);
    }
    // Nulls are the "clear this field" marker, so every field also admits null.
    for property in merged.values_mut() {
        *property = json!({ "anyOf": [property.clone(), { "type": "null" }] });
    }
    json!({ "type": "object", "properties": merged })
}

/// Validates a merged config against the widget type's field schema and
/// returns the violation list. Unknown widget types validate vacuously; the
/// dispatcher reports those separately.
pub fn validate_config(widget_type: WidgetType, config: &Map<String, Value>) -> Vec<String> {
    let Some(schema) = FIELD_SCHEMAS.get(&widget_type) else {
        return Vec::new();
    };
    let compiled = match jsonschema::JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(error) => {
            tracing::warn!(widget_type = widget_type.as_str(), error = %error, "field schema failed to compile");
            return Vec::new();
        }
    };
    let value = Value::Object(config.clone());
    compiled
        .validate(&value)
        .err()
        .map(|errors| {
            errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn merge_with_empty_overrides_is_identity() {
        let existing = map(json!({"title": "Leads", "metric_type": "sum"}));
        assert_eq!(merge_config(&existing, &Map::new()), existing);
    }

    #[test]
    fn merge_never_drops_unrelated_keys() {
        let existing = map(json!({"title": "Leads", "metric_type": "sum", "format": "currency"}));
        let overrides = map(json!({"metric_type": "count"}));
        let merged = merge_config(&existing, &overrides);
        assert_eq!(merged.get("title"), Some(&json!("Leads")));
        assert_eq!(merged.get("format"), Some(&json!("currency")));
        assert_eq!(merged.get("metric_type"), Some(&json!("count")));
    }

    #[test]
    fn explicit_null_clears_back_to_default() {
        let existing = map(json!({"metric_type": "sum"}));
        let overrides = map(json!({"metric_type": null}));
        let merged = merge_config(&existing, &overrides);
        assert_eq!(merged.get("metric_type"), Some(&Value::Null));

        let resolved = resolve_config("metric_card", &merged).expect("known type");
        let WidgetConfig::MetricCard(card) = resolved.config else {
            panic!("expected metric card config");
        };
        assert_eq!(card.metric_type, MetricKind::Count);
    }

    #[test]
    fn dialog_config_fills_source_fallback_only_when_unbound() {
        let descriptor = WidgetTypeDescriptor {
            widget_type: WidgetType::MetricCard,
            category: "Metrics".to_string(),
            name: "Metric Card".to_string(),
            description: String::new(),
            default_config: map(json!({"metric_type": "count"})),
        };
        let mut instance = WidgetInstance {
            id: "widget_1".to_string(),
            widget_type: "metric_card".to_string(),
            data_source_id: String::new(),
            config: map(json!({"title": "Leads"})),
        };

        let merged = dialog_config(&descriptor, &instance, Some("ds-1"));
        assert_eq!(merged.get("data_source_id"), Some(&json!("ds-1")));
        assert_eq!(merged.get("metric_type"), Some(&json!("count")));
        assert_eq!(merged.get("title"), Some(&json!("Leads")));

        instance.data_source_id = "ds-9".to_string();
        let merged = dialog_config(&descriptor, &instance, Some("ds-1"));
        assert_eq!(merged.get("data_source_id"), None);
    }

    #[test]
    fn data_table_columns_split_and_page_size_clamped() {
        let config = map(json!({"columns": " name, email ,, status ", "page_size": "250"}));
        let resolved = resolve_config("data_table", &config).expect("known type");
        let WidgetConfig::DataTable(table) = resolved.config else {
            panic!("expected table config");
        };
        assert_eq!(
            table.columns,
            Some(vec!["name".to_string(), "email".to_string(), "status".to_string()])
        );
        assert_eq!(table.page_size, 100);

        let resolved = resolve_config("data_table", &Map::new()).expect("known type");
        let WidgetConfig::DataTable(table) = resolved.config else {
            panic!("expected table config");
        };
        assert_eq!(table.page_size, 10);
        assert_eq!(table.columns, None);
    }

    #[test]
    fn unknown_widget_type_resolves_to_none() {
        assert!(resolve_config("gauge", &Map::new()).is_none());
    }

    #[test]
    fn title_falls_back_to_display_name() {
        let resolved = resolve_config("revenue_metric", &Map::new()).expect("known type");
        assert_eq!(resolved.title, "Revenue Metric");
    }

    #[test]
    fn validate_config_reports_bad_enum_and_range() {
        let config = map(json!({"metric_type": "median", "trend_comparison": "yes"}));
        let violations = validate_config(WidgetType::MetricCard, &config);
        assert_eq!(violations.len(), 2);

        let config = map(json!({"page_size": 500}));
        let violations = validate_config(WidgetType::DataTable, &config);
        assert_eq!(violations.len(), 1);

        let config = map(json!({"metric_type": null}));
        assert!(validate_config(WidgetType::MetricCard, &config).is_empty());
    }
}
