//! Data table renderer.

use super::{format, RenderedWidget};
use crate::schema::DataTableConfig;
use serde_json::Value;

pub fn render_data_table(title: &str, config: &DataTableConfig, data: &Value) -> RenderedWidget {
    let rows = match data {
        Value::Array(rows) if !rows.is_empty() => rows,
        _ => {
            return RenderedWidget::Empty {
                title: title.to_string(),
                message: "No data available".to_string(),
            }
        }
    };

    // Configured columns win; otherwise derive from the first row's keys.
    let columns: Vec<String> = match &config.columns {
        Some(columns) => columns.clone(),
        None => rows[0]
            .as_object()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default(),
    };

    let headers = columns.iter().map(|column| format::header_label(column)).collect();

    let total = rows.len();
    let body: Vec<Vec<String>> = rows
        .iter()
        .take(config.page_size)
        .map(|row| columns.iter().map(|column| cell_text(row.get(column))).collect())
        .collect();

    let footer = (total > config.page_size)
        .then(|| format!("Showing {} of {} rows", body.len(), total));

    RenderedWidget::DataTable {
        title: title.to_string(),
        headers,
        rows: body,
        footer,
    }
}

/// Missing and null cells render as a placeholder dash rather than blank.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "—".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_size_slices_rows_and_footer_counts() {
        let config = DataTableConfig {
            columns: None,
            page_size: 1,
        };
        let data = json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}]);
        let RenderedWidget::DataTable { rows, footer, .. } = render_data_table("Rows", &config, &data)
        else {
            panic!("expected data table");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(footer.as_deref(), Some("Showing 1 of 2 rows"));
    }

    #[test]
    fn footer_absent_when_everything_fits() {
        let config = DataTableConfig::default();
        let data = json!([{"a": 1}, {"a": 2}]);
        let RenderedWidget::DataTable { footer, .. } = render_data_table("Rows", &config, &data) else {
            panic!("expected data table");
        };
        assert_eq!(footer, None);
    }

    #[test]
    fn derives_columns_from_first_row_and_titles_headers() {
        let config = DataTableConfig::default();
        let data = json!([{"full_name": "Ada", "created_at": "2026-01-01"}]);
        let RenderedWidget::DataTable { headers, .. } = render_data_table("People", &config, &data)
        else {
            panic!("expected data table");
        };
        assert!(headers.contains(&"Full Name".to_string()));
        assert!(headers.contains(&"Created At".to_string()));
    }

    #[test]
    fn missing_and_null_cells_render_as_dash() {
        let config = DataTableConfig {
            columns: Some(vec!["name".to_string(), "email".to_string()]),
            page_size: 10,
        };
        let data = json!([{"name": "Ada", "email": null}, {"name": "Grace"}]);
        let RenderedWidget::DataTable { rows, .. } = render_data_table("People", &config, &data) else {
            panic!("expected data table");
        };
        assert_eq!(rows[0][1], "—");
        assert_eq!(rows[1][1], "—");
    }

    #[test]
    fn empty_data_renders_placeholder() {
        let config = DataTableConfig::default();
        assert!(matches!(
            render_data_table("Rows", &config, &json!([])),
            RenderedWidget::Empty { .. }
        ));
    }
}
