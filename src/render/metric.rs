//! Metric card and revenue metric renderers.

use super::format;
use super::{ChangeIndicator, RenderedWidget, TrendDirection, TrendIndicator};
use crate::schema::{coerce_number, MetricCardConfig, MetricKind, RevenueKind, RevenueMetricConfig, ValueFormat};
use serde_json::Value;

/// Reduces the fetched data to the single number a metric card shows.
///
/// Array-shaped data: `count` is the array length, `sum`/`average` reduce each
/// element's `value` field treating missing or non-numeric as 0; anything else
/// falls back to the length. Record-shaped data prefers `count` for the count
/// metric, then `value`, then 0.
pub fn metric_value(data: &Value, kind: MetricKind) -> f64 {
    match data {
        Value::Array(rows) => match kind {
            MetricKind::Sum => sum_values(rows),
            MetricKind::Average => {
                if rows.is_empty() {
                    0.0
                } else {
                    sum_values(rows) / rows.len() as f64
                }
            }
            _ => rows.len() as f64,
        },
        record => {
            if kind == MetricKind::Count {
                if let Some(count) = record.get("count").and_then(coerce_number) {
                    return count;
                }
            }
            record.get("value").and_then(coerce_number).unwrap_or(0.0)
        }
    }
}

fn sum_values(rows: &[Value]) -> f64 {
    rows.iter()
        .map(|row| row.get("value").and_then(coerce_number).unwrap_or(0.0))
        .sum()
}

fn formatted_value(value: f64, format: ValueFormat) -> String {
    match format {
        ValueFormat::Currency => format::currency(value, "$", 2),
        ValueFormat::Percentage => format::percent(value),
        ValueFormat::Number => format::number(value),
    }
}

fn trend_indicator(data: &Value) -> Option<TrendIndicator> {
    let trend = data
        .get("trend")
        .and_then(coerce_number)
        .or_else(|| data.get("change").and_then(coerce_number))?;
    let direction = if trend > 0.0 {
        TrendDirection::Up
    } else if trend < 0.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };
    Some(TrendIndicator {
        direction,
        percent: trend,
    })
}

pub fn render_metric_card(title: &str, config: &MetricCardConfig, data: &Value) -> RenderedWidget {
    let value = metric_value(data, config.metric_type);
    let trend = if config.trend_comparison {
        trend_indicator(data)
    } else {
        None
    };
    RenderedWidget::MetricCard {
        title: title.to_string(),
        value: formatted_value(value, config.format),
        trend,
    }
}

pub fn render_revenue_metric(title: &str, config: &RevenueMetricConfig, data: &Value) -> RenderedWidget {
    let value = data.get("value").and_then(coerce_number).unwrap_or(0.0);
    let change = data.get("change").and_then(coerce_number).unwrap_or(0.0);

    let display = match config.metric_type {
        RevenueKind::ChurnRate => format::percent(value),
        _ => format::currency(value, config.currency.symbol(), 0),
    };

    // Change indicator only when the change is nonzero.
    let change = (change != 0.0).then(|| ChangeIndicator {
        direction: if change > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        },
        amount: change,
    });

    RenderedWidget::RevenueMetric {
        title: title.to_string(),
        value: display,
        change,
    }
}
