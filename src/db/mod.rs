use crate::catalog::builtin_descriptors;
use crate::errors::{AppError, AppResult};
use crate::fetch::{FetchFuture, WidgetDataProvider};
use crate::models::{
    CreateDataSourcePayload, DashboardConfig, DashboardConfigRecord, DataSourceDescriptor, QueryConfig,
    TableOperation, TableQuery, WidgetTypeDescriptor,
};
use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Persistence API the engine talks to. `db::Database` is the shipped
/// implementation; shells backed by something else implement this themselves.
pub trait DashboardStore: Send + Sync {
    fn create_dashboard_config(&self, payload: &DashboardConfig) -> AppResult<DashboardConfigRecord>;
    fn list_user_dashboard_configs(&self, user_id: &str) -> AppResult<Vec<DashboardConfigRecord>>;
    fn list_widget_types(&self) -> AppResult<Vec<WidgetTypeDescriptor>>;
    fn list_data_sources(&self) -> AppResult<Vec<DataSourceDescriptor>>;
    fn create_data_source(&self, payload: &CreateDataSourcePayload) -> AppResult<DataSourceDescriptor>;
}

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.seed_widget_types()?;
        db.seed_demo_data()?;
        db.seed_default_data_sources()?;
        Ok(db)
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    fn seed_widget_types(&self) -> AppResult<()> {
        let conn = self.lock()?;
        for (position, descriptor) in builtin_descriptors().into_iter().enumerate() {
            conn.execute(
                "INSERT OR IGNORE INTO widget_types
                   (widget_type, category, name, description, default_config_json, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    descriptor.widget_type.as_str(),
                    descriptor.category,
                    descriptor.name,
                    descriptor.description,
                    serde_json::to_string(&descriptor.default_config)?,
                    position as i64,
                ],
            )?;
        }
        Ok(())
    }

    fn seed_demo_data(&self) -> AppResult<()> {
        let conn = self.lock()?;
        let existing: i64 = conn.query_row("SELECT COUNT(1) FROM users", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let users = [
            ("u1", "Ada Lovelace", "ada@example.com", "active"),
            ("u2", "Grace Hopper", "grace@example.com", "active"),
            ("u3", "Alan Kay", "alan@example.com", "active"),
            ("u4", "Barbara Liskov", "barbara@example.com", "invited"),
            ("u5", "Edsger Dijkstra", "edsger@example.com", "suspended"),
        ];
        for (id, full_name, email, status) in users {
            conn.execute(
                "INSERT INTO users (id, full_name, email, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, full_name, email, status, now],
            )?;
        }

        let companies = [
            ("c1", "Northwind Talent", "Recruiting", 40),
            ("c2", "Acme Staffing", "Staffing", 120),
            ("c3", "Globex HR", "HR Tech", 15),
        ];
        for (id, name, industry, headcount) in companies {
            conn.execute(
                "INSERT INTO companies (id, name, industry, headcount, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, name, industry, headcount, now],
            )?;
        }

        let subscriptions = [
            ("s1", "c1", "growth", "active", 299.0),
            ("s2", "c2", "enterprise", "active", 999.0),
            ("s3", "c3", "starter", "canceled", 49.0),
        ];
        for (id, company_id, plan, status, amount) in subscriptions {
            conn.execute(
                "INSERT INTO subscriptions (id, company_id, plan, status, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, company_id, plan, status, amount, now],
            )?;
        }
        Ok(())
    }

    fn seed_default_data_sources(&self) -> AppResult<()> {
        {
            let conn = self.lock()?;
            let existing: i64 = conn.query_row("SELECT COUNT(1) FROM data_sources", [], |row| row.get(0))?;
            if existing > 0 {
                return Ok(());
            }
        }

        let count_source = |name: &str, table: &str, filters| CreateDataSourcePayload {
            name: name.to_string(),
            query_config: QueryConfig::TableQuery(TableQuery {
                table: table.to_string(),
                operation: TableOperation::Count,
                columns: vec!["*".to_string()],
                filters,
            }),
            refresh_interval_seconds: Some(300),
            cache_duration_seconds: Some(300),
        };

        self.create_data_source(&count_source("Users Count", "users", vec![]))?;
        self.create_data_source(&count_source("Companies Count", "companies", vec![]))?;
        self.create_data_source(&count_source(
            "Active Subscriptions",
            "subscriptions",
            vec![crate::models::QueryFilter {
                column: "status".to_string(),
                operator: crate::models::FilterOperator::Equals,
                value: "active".to_string(),
            }],
        ))?;
        self.create_data_source(&CreateDataSourcePayload {
            name: "Monthly Revenue".to_string(),
            query_config: QueryConfig::Calculated {
                metric: Some("monthly_revenue".to_string()),
            },
            refresh_interval_seconds: Some(300),
            cache_duration_seconds: Some(300),
        })?;
        Ok(())
    }

    // ─── Widget data queries ────────────────────────────────────────────────

    pub fn fetch_widget_data(&self, source: &DataSourceDescriptor) -> AppResult<Value> {
        match &source.query_config {
            QueryConfig::TableQuery(query) => self.run_table_query(query),
            QueryConfig::CustomQuery { query } => self.run_custom_query(query),
            QueryConfig::Calculated { metric } => self.run_calculated(metric.as_deref()),
        }
    }

    pub fn run_table_query(&self, query: &TableQuery) -> AppResult<Value> {
        check_identifier(&query.table)?;
        for column in &query.columns {
            if column != "*" {
                check_identifier(column)?;
            }
        }
        for filter in &query.filters {
            check_identifier(&filter.column)?;
        }

        let mut clauses = Vec::new();
        let mut params_vec: Vec<String> = Vec::new();
        for filter in &query.filters {
            let clause = match filter.operator {
                crate::models::FilterOperator::Equals => format!("{} = ?", filter.column),
                crate::models::FilterOperator::Contains => format!("{} LIKE ?", filter.column),
                crate::models::FilterOperator::GreaterThan => format!("{} > ?", filter.column),
                crate::models::FilterOperator::LessThan => format!("{} < ?", filter.column),
            };
            clauses.push(clause);
            let value = match filter.operator {
                crate::models::FilterOperator::Contains => format!("%{}%", filter.value),
                _ => filter.value.clone(),
            };
            params_vec.push(value);
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let conn = self.lock()?;
        match query.operation {
            TableOperation::Count => {
                let sql = format!("SELECT COUNT(*) FROM {}{}", query.table, where_sql);
                let count: i64 = conn.query_row(
                    &sql,
                    rusqlite::params_from_iter(params_vec.iter()),
                    |row| row.get(0),
                )?;
                Ok(json!({ "count": count }))
            }
            TableOperation::Select => {
                let columns_sql = if query.columns.iter().any(|column| column == "*") {
                    "*".to_string()
                } else {
                    query.columns.join(", ")
                };
                let sql = format!("SELECT {} FROM {}{}", columns_sql, query.table, where_sql);
                rows_to_json(&conn, &sql, &params_vec)
            }
        }
    }

    /// Custom queries are read-only: anything but a single SELECT statement is
    /// rejected before touching the connection.
    pub fn run_custom_query(&self, raw: &str) -> AppResult<Value> {
        let trimmed = raw.trim().trim_end_matches(';');
        if !trimmed.to_ascii_lowercase().starts_with("select") || trimmed.contains(';') {
            return Err(AppError::Precondition(
                "Custom queries must be a single SELECT statement".to_string(),
            ));
        }
        let conn = self.lock()?;
        rows_to_json(&conn, trimmed, &[])
    }

    pub fn run_calculated(&self, metric: Option<&str>) -> AppResult<Value> {
        match metric {
            Some("monthly_revenue") => {
                let conn = self.lock()?;
                let value: f64 = conn.query_row(
                    "SELECT COALESCE(SUM(amount), 0) FROM subscriptions WHERE status = 'active'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(json!({ "value": value, "change": 0.0 }))
            }
            other => Err(AppError::Fetch(format!(
                "Unknown calculated metric: {}",
                other.unwrap_or("(unset)")
            ))),
        }
    }
}

impl DashboardStore for Database {
    fn create_dashboard_config(&self, payload: &DashboardConfig) -> AppResult<DashboardConfigRecord> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO dashboard_configs
               (id, user_id, dashboard_name, layout_config_json, widget_configs_json, filters_json, is_default, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                payload.user_id,
                payload.dashboard_name,
                serde_json::to_string(&payload.layout_config)?,
                serde_json::to_string(&payload.widget_configs)?,
                serde_json::to_string(&payload.filters)?,
                payload.is_default as i64,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        Ok(DashboardConfigRecord {
            id,
            user_id: payload.user_id.clone(),
            dashboard_name: payload.dashboard_name.clone(),
            layout_config: payload.layout_config.clone(),
            widget_configs: payload.widget_configs.clone(),
            filters: payload.filters.clone(),
            is_default: payload.is_default,
            created_at: now,
            updated_at: now,
        })
    }

    fn list_user_dashboard_configs(&self, user_id: &str) -> AppResult<Vec<DashboardConfigRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, dashboard_name, layout_config_json, widget_configs_json, filters_json, is_default, created_at, updated_at
             FROM dashboard_configs WHERE user_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (id, user_id, dashboard_name, layout_json, widgets_json, filters_json, is_default, created, updated) = row?;
            result.push(DashboardConfigRecord {
                id,
                user_id,
                dashboard_name,
                layout_config: serde_json::from_str(&layout_json)?,
                widget_configs: serde_json::from_str(&widgets_json)?,
                filters: serde_json::from_str(&filters_json)?,
                is_default: is_default != 0,
                created_at: parse_time(&created)?,
                updated_at: parse_time(&updated)?,
            });
        }
        Ok(result)
    }

    fn list_widget_types(&self) -> AppResult<Vec<WidgetTypeDescriptor>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT widget_type, category, name, description, default_config_json
             FROM widget_types ORDER BY position ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (widget_type, category, name, description, config_json) = row?;
            let Some(widget_type) = crate::models::WidgetType::parse(&widget_type) else {
                tracing::warn!(widget_type, "skipping unrecognized widget type row");
                continue;
            };
            result.push(WidgetTypeDescriptor {
                widget_type,
                category,
                name,
                description,
                default_config: serde_json::from_str(&config_json)?,
            });
        }
        Ok(result)
    }

    fn list_data_sources(&self) -> AppResult<Vec<DataSourceDescriptor>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, source_type, query_config_json, refresh_interval_seconds, cache_duration_seconds, created_at, updated_at
             FROM data_sources ORDER BY created_at ASC, name ASC",
        )?;
        let rows = stmt.query_map([], parse_data_source_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Creating with an existing name re-saves that source in place, which is
    /// how the dialog edits a source (there is no separate update call).
    fn create_data_source(&self, payload: &CreateDataSourcePayload) -> AppResult<DataSourceDescriptor> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO data_sources
               (id, name, source_type, query_config_json, refresh_interval_seconds, cache_duration_seconds, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(name) DO UPDATE SET
               source_type = excluded.source_type,
               query_config_json = excluded.query_config_json,
               refresh_interval_seconds = excluded.refresh_interval_seconds,
               cache_duration_seconds = excluded.cache_duration_seconds,
               updated_at = excluded.updated_at",
            params![
                Uuid::new_v4().to_string(),
                payload.name,
                payload.query_config.source_type().as_str(),
                serde_json::to_string(&payload.query_config)?,
                payload.refresh_interval_seconds.unwrap_or(300),
                payload.cache_duration_seconds.unwrap_or(300),
                now,
                now,
            ],
        )?;

        let mut stmt = conn.prepare(
            "SELECT id, name, source_type, query_config_json, refresh_interval_seconds, cache_duration_seconds, created_at, updated_at
             FROM data_sources WHERE name = ?1",
        )?;
        let descriptor = stmt.query_row([&payload.name], parse_data_source_row)?;
        Ok(descriptor)
    }
}

/// Adapts the local database to the fetch layer's provider contract.
#[derive(Clone)]
pub struct SqliteDataProvider {
    db: Arc<Database>,
}

impl SqliteDataProvider {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl WidgetDataProvider for SqliteDataProvider {
    fn fetch_widget_data(&self, source: &DataSourceDescriptor, _config: &Map<String, Value>) -> FetchFuture {
        let result = self.db.fetch_widget_data(source);
        Box::pin(async move { result })
    }
}

fn parse_data_source_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DataSourceDescriptor> {
    let query_json: String = row.get(3)?;
    let query_config: QueryConfig = serde_json::from_str(&query_json).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(err))
    })?;
    let created: String = row.get(6)?;
    let updated: String = row.get(7)?;
    Ok(DataSourceDescriptor {
        id: row.get(0)?,
        name: row.get(1)?,
        source_type: query_config.source_type(),
        query_config,
        refresh_interval_seconds: row.get(4)?,
        cache_duration_seconds: row.get(5)?,
        created_at: parse_time_sql(&created, 6)?,
        updated_at: parse_time_sql(&updated, 7)?,
    })
}

fn parse_time(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|err| AppError::Internal(format!("invalid timestamp '{}': {}", raw, err)))
}

fn parse_time_sql(raw: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err)))
}

fn check_identifier(identifier: &str) -> AppResult<()> {
    let mut chars = identifier.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Precondition(format!("Invalid identifier: {}", identifier)))
    }
}

fn rows_to_json(conn: &Connection, sql: &str, params_vec: &[String]) -> AppResult<Value> {
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt.column_names().into_iter().map(ToString::to_string).collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;

    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = Map::new();
        for (index, name) in column_names.iter().enumerate() {
            object.insert(name.clone(), column_value(row.get_ref(index)?));
        }
        result.push(Value::Object(object));
    }
    Ok(Value::Array(result))
}

fn column_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) => json!(int),
        ValueRef::Real(real) => json!(real),
        ValueRef::Text(text) => json!(String::from_utf8_lossy(text)),
        ValueRef::Blob(_) => Value::Null,
    }
}
