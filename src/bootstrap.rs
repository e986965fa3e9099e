//! Bootstrap policy for users with no saved dashboard.
//!
//! The mapping from semantic metric to data source is by display name, which
//! is deliberately a seed policy rather than core logic: there is no stable
//! identifier linking "the users metric" to a particular source, so the rule
//! table is overridable and nothing else in the crate depends on it.

use crate::catalog::default_config;
use crate::models::{DashboardConfigRecord, DataSourceDescriptor, WidgetInstance, WidgetType};
use crate::schema::merge_config;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct SeedRule {
    /// Data source display name this rule binds to.
    pub source_name: String,
    pub widget_type: WidgetType,
    pub overrides: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct DefaultWidgetPolicy {
    rules: Vec<SeedRule>,
}

impl DefaultWidgetPolicy {
    pub fn with_rules(rules: Vec<SeedRule>) -> Self {
        Self { rules }
    }

    /// Synthesizes fallback widgets for every rule whose source name exists.
    /// Sources with no rule, and rules with no source, are skipped.
    pub fn synthesize(&self, sources: &[DataSourceDescriptor]) -> Vec<WidgetInstance> {
        self.rules
            .iter()
            .enumerate()
            .filter_map(|(index, rule)| {
                let source = sources.iter().find(|source| source.name == rule.source_name)?;
                let mut overrides = rule.overrides.clone();
                overrides.insert("title".to_string(), json!(source.name));
                overrides.insert("data_source_id".to_string(), json!(source.id));
                Some(WidgetInstance {
                    id: format!("bootstrap_{}", index),
                    widget_type: rule.widget_type.as_str().to_string(),
                    data_source_id: source.id.clone(),
                    config: merge_config(&default_config(rule.widget_type), &overrides),
                })
            })
            .collect()
    }
}

impl Default for DefaultWidgetPolicy {
    fn default() -> Self {
        let count_card: Map<String, Value> = Map::new();
        Self {
            rules: vec![
                SeedRule {
                    source_name: "Users Count".to_string(),
                    widget_type: WidgetType::MetricCard,
                    overrides: count_card.clone(),
                },
                SeedRule {
                    source_name: "Companies Count".to_string(),
                    widget_type: WidgetType::MetricCard,
                    overrides: count_card.clone(),
                },
                SeedRule {
                    source_name: "Active Subscriptions".to_string(),
                    widget_type: WidgetType::MetricCard,
                    overrides: count_card,
                },
                SeedRule {
                    source_name: "Monthly Revenue".to_string(),
                    widget_type: WidgetType::RevenueMetric,
                    overrides: Map::new(),
                },
            ],
        }
    }
}

/// Which saved dashboard to show: the first flagged default, else the first.
pub fn choose_default(configs: &[DashboardConfigRecord]) -> Option<&DashboardConfigRecord> {
    configs.iter().find(|config| config.is_default).or_else(|| configs.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LayoutConfig, QueryConfig, SourceType};
    use chrono::Utc;

    fn source(id: &str, name: &str) -> DataSourceDescriptor {
        DataSourceDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            source_type: SourceType::Calculated,
            query_config: QueryConfig::Calculated { metric: None },
            refresh_interval_seconds: 300,
            cache_duration_seconds: 300,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn record(id: &str, is_default: bool) -> DashboardConfigRecord {
        DashboardConfigRecord {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            dashboard_name: id.to_string(),
            layout_config: LayoutConfig::default(),
            widget_configs: Vec::new(),
            filters: Map::new(),
            is_default,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn synthesizes_only_for_matching_source_names() {
        let sources = vec![
            source("ds-1", "Users Count"),
            source("ds-2", "Monthly Revenue"),
            source("ds-3", "Unrelated Export"),
        ];
        let widgets = DefaultWidgetPolicy::default().synthesize(&sources);
        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[0].widget_type, "metric_card");
        assert_eq!(widgets[0].data_source_id, "ds-1");
        assert_eq!(widgets[0].config.get("title"), Some(&json!("Users Count")));
        assert_eq!(widgets[1].widget_type, "revenue_metric");
        assert_eq!(widgets[1].config.get("metric_type"), Some(&json!("mrr")));
    }

    #[test]
    fn synthesize_with_no_sources_is_empty() {
        let widgets = DefaultWidgetPolicy::default().synthesize(&[]);
        assert!(widgets.is_empty());
    }

    #[test]
    fn custom_rules_override_the_shipped_table() {
        let policy = DefaultWidgetPolicy::with_rules(vec![SeedRule {
            source_name: "Pipeline".to_string(),
            widget_type: WidgetType::BarChart,
            overrides: Map::new(),
        }]);
        let widgets = policy.synthesize(&[source("ds-9", "Pipeline")]);
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].widget_type, "bar_chart");
    }

    #[test]
    fn default_dashboard_is_first_flagged_else_first() {
        let configs = vec![record("a", false), record("b", true), record("c", true)];
        assert_eq!(choose_default(&configs).map(|config| config.id.as_str()), Some("b"));

        let configs = vec![record("a", false), record("b", false)];
        assert_eq!(choose_default(&configs).map(|config| config.id.as_str()), Some("a"));

        assert!(choose_default(&[]).is_none());
    }
}
