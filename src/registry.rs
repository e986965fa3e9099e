use crate::db::DashboardStore;
use crate::errors::{AppError, AppResult};
use crate::models::{CreateDataSourcePayload, DataSourceDescriptor, QueryConfig};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// Floor for refresh and cache intervals; the dialog enforces the same bound.
pub const MIN_INTERVAL_SECONDS: i64 = 60;
const DEFAULT_INTERVAL_SECONDS: i64 = 300;
const SNAPSHOT_TTL_SECONDS: i64 = 60;

/// Registry of data source descriptors over the store, with a short-lived list
/// snapshot. Readers get idempotent snapshots; creates replace the snapshot
/// wholesale, so no record is mutated while another reader holds it.
pub struct DataSourceRegistry {
    store: Arc<dyn DashboardStore>,
    snapshot: Mutex<Option<(Vec<DataSourceDescriptor>, DateTime<Utc>)>>,
}

impl DataSourceRegistry {
    pub fn new(store: Arc<dyn DashboardStore>) -> Self {
        Self {
            store,
            snapshot: Mutex::new(None),
        }
    }

    pub fn list(&self) -> AppResult<Vec<DataSourceDescriptor>> {
        let mut snapshot = self
            .snapshot
            .lock()
            .map_err(|_| AppError::Internal("registry mutex poisoned".to_string()))?;
        if let Some((sources, taken_at)) = snapshot.as_ref() {
            let age = Utc::now().signed_duration_since(*taken_at).num_seconds();
            if age < SNAPSHOT_TTL_SECONDS {
                return Ok(sources.clone());
            }
        }
        let sources = self.store.list_data_sources()?;
        *snapshot = Some((sources.clone(), Utc::now()));
        Ok(sources)
    }

    pub fn create(&self, payload: CreateDataSourcePayload) -> AppResult<DataSourceDescriptor> {
        let normalized = normalize_payload(payload)?;
        let created = self.store.create_data_source(&normalized)?;
        tracing::info!(source_id = %created.id, name = %created.name, "data source created");
        self.invalidate()?;
        Ok(created)
    }

    pub fn invalidate(&self) -> AppResult<()> {
        let mut snapshot = self
            .snapshot
            .lock()
            .map_err(|_| AppError::Internal("registry mutex poisoned".to_string()))?;
        *snapshot = None;
        Ok(())
    }
}

fn normalize_payload(mut payload: CreateDataSourcePayload) -> AppResult<CreateDataSourcePayload> {
    payload.name = payload.name.trim().to_string();
    if payload.name.is_empty() {
        return Err(AppError::Precondition("Data source name is required".to_string()));
    }

    if let QueryConfig::TableQuery(query) = &mut payload.query_config {
        query.table = query.table.trim().to_string();
        if query.table.is_empty() {
            return Err(AppError::Precondition("Table name is required".to_string()));
        }
        // Filters missing a column or value are dropped silently; an
        // incomplete filter row in the dialog is a no-op, not an error.
        query
            .filters
            .retain(|filter| !filter.column.trim().is_empty() && !filter.value.trim().is_empty());
        query.columns.retain(|column| !column.trim().is_empty());
        if query.columns.is_empty() {
            query.columns.push("*".to_string());
        }
    }

    payload.refresh_interval_seconds = Some(
        payload
            .refresh_interval_seconds
            .unwrap_or(DEFAULT_INTERVAL_SECONDS)
            .max(MIN_INTERVAL_SECONDS),
    );
    payload.cache_duration_seconds = Some(
        payload
            .cache_duration_seconds
            .unwrap_or(DEFAULT_INTERVAL_SECONDS)
            .max(MIN_INTERVAL_SECONDS),
    );
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CreateDataSourcePayload, DashboardConfig, DashboardConfigRecord, FilterOperator, QueryFilter,
        SourceType, TableOperation, TableQuery, WidgetTypeDescriptor,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryStore {
        sources: Mutex<Vec<DataSourceDescriptor>>,
        list_calls: AtomicUsize,
    }

    impl DashboardStore for MemoryStore {
        fn create_dashboard_config(&self, _payload: &DashboardConfig) -> AppResult<DashboardConfigRecord> {
            Err(AppError::Internal("not used in registry tests".to_string()))
        }

        fn list_user_dashboard_configs(&self, _user_id: &str) -> AppResult<Vec<DashboardConfigRecord>> {
            Ok(Vec::new())
        }

        fn list_widget_types(&self) -> AppResult<Vec<WidgetTypeDescriptor>> {
            Ok(Vec::new())
        }

        fn list_data_sources(&self) -> AppResult<Vec<DataSourceDescriptor>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.sources.lock().expect("sources mutex").clone())
        }

        fn create_data_source(&self, payload: &CreateDataSourcePayload) -> AppResult<DataSourceDescriptor> {
            let descriptor = DataSourceDescriptor {
                id: format!("ds-{}", self.sources.lock().expect("sources mutex").len() + 1),
                name: payload.name.clone(),
                source_type: payload.query_config.source_type(),
                query_config: payload.query_config.clone(),
                refresh_interval_seconds: payload.refresh_interval_seconds.unwrap_or(300),
                cache_duration_seconds: payload.cache_duration_seconds.unwrap_or(300),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.sources.lock().expect("sources mutex").push(descriptor.clone());
            Ok(descriptor)
        }
    }

    fn table_payload(filters: Vec<QueryFilter>) -> CreateDataSourcePayload {
        CreateDataSourcePayload {
            name: "  Active Users  ".to_string(),
            query_config: QueryConfig::TableQuery(TableQuery {
                table: "users".to_string(),
                operation: TableOperation::Count,
                columns: vec![],
                filters,
            }),
            refresh_interval_seconds: Some(5),
            cache_duration_seconds: None,
        }
    }

    #[test]
    fn create_drops_incomplete_filters_silently() {
        let store = Arc::new(MemoryStore::default());
        let registry = DataSourceRegistry::new(store);
        let created = registry
            .create(table_payload(vec![
                QueryFilter {
                    column: "status".to_string(),
                    operator: FilterOperator::Equals,
                    value: "active".to_string(),
                },
                QueryFilter {
                    column: "".to_string(),
                    operator: FilterOperator::Contains,
                    value: "x".to_string(),
                },
                QueryFilter {
                    column: "plan".to_string(),
                    operator: FilterOperator::Equals,
                    value: "  ".to_string(),
                },
            ]))
            .expect("create data source");

        let QueryConfig::TableQuery(query) = created.query_config else {
            panic!("expected table query");
        };
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].column, "status");
        assert_eq!(query.columns, vec!["*".to_string()]);
    }

    #[test]
    fn create_clamps_intervals_and_trims_name() {
        let store = Arc::new(MemoryStore::default());
        let registry = DataSourceRegistry::new(store);
        let created = registry.create(table_payload(vec![])).expect("create data source");
        assert_eq!(created.name, "Active Users");
        assert_eq!(created.refresh_interval_seconds, MIN_INTERVAL_SECONDS);
        assert_eq!(created.cache_duration_seconds, 300);
        assert_eq!(created.source_type, SourceType::TableQuery);
    }

    #[test]
    fn create_rejects_empty_name() {
        let store = Arc::new(MemoryStore::default());
        let registry = DataSourceRegistry::new(store);
        let mut payload = table_payload(vec![]);
        payload.name = "   ".to_string();
        assert!(matches!(registry.create(payload), Err(AppError::Precondition(_))));
    }

    #[test]
    fn list_serves_snapshot_until_invalidated() {
        let store = Arc::new(MemoryStore::default());
        let registry = DataSourceRegistry::new(store.clone());

        registry.list().expect("first list");
        registry.list().expect("second list");
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);

        registry.create(table_payload(vec![])).expect("create data source");
        let sources = registry.list().expect("list after create");
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(sources.len(), 1);
    }
}
