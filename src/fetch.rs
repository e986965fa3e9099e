use crate::errors::AppResult;
use crate::models::{DataSourceDescriptor, WidgetDataState};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type FetchFuture = Pin<Box<dyn Future<Output = AppResult<Value>> + Send>>;

/// Opaque data-fetch collaborator. Boxed futures keep the trait object-safe
/// for injection.
pub trait WidgetDataProvider: Send + Sync {
    fn fetch_widget_data(&self, source: &DataSourceDescriptor, config: &Map<String, Value>) -> FetchFuture;
}

/// Config keys that change what data a fetch yields. Presentation-only keys
/// (title, format, page_size) must not fragment the cache.
const RELEVANT_CONFIG_KEYS: [&str; 5] = ["metric_type", "x_axis", "y_axis", "data_column", "columns"];

#[derive(Debug, Clone)]
enum FetchOutcome {
    Data(Value),
    Failed(String),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: FetchOutcome,
    fetched_at: DateTime<Utc>,
}

/// Widget data binding layer: one in-flight fetch per `(source id, relevant
/// config)` key, results cached for the source's `cacheDurationSeconds`,
/// failures retried once `refreshIntervalSeconds` has elapsed. Failures stay
/// local to the requesting widget.
#[derive(Clone)]
pub struct FetchLayer {
    provider: Arc<dyn WidgetDataProvider>,
    cache: Arc<Mutex<HashMap<String, CacheEntry>>>,
    gates: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl FetchLayer {
    pub fn new(provider: Arc<dyn WidgetDataProvider>) -> Self {
        Self {
            provider,
            cache: Arc::new(Mutex::new(HashMap::new())),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Non-blocking snapshot for skeleton rendering: loading until a result or
    /// error is cached for this key.
    pub async fn peek(&self, source: &DataSourceDescriptor, config: &Map<String, Value>) -> WidgetDataState {
        let key = fetch_key(source, config);
        let cache = self.cache.lock().await;
        match cache.get(&key) {
            Some(entry) => entry_state(entry),
            None => WidgetDataState::loading(),
        }
    }

    /// Resolves the widget's data, fetching through the provider when the
    /// cache is missing or stale. Never returns an `Err`: fetch failures come
    /// back as the state's inline error message.
    pub async fn widget_data(&self, source: &DataSourceDescriptor, config: &Map<String, Value>) -> WidgetDataState {
        let key = fetch_key(source, config);

        if let Some(state) = self.cached_state(source, &key).await {
            return state;
        }

        // Per-key gate: the first caller fetches, concurrent callers queue on
        // the gate and find the fresh cache entry when they get through.
        let gate = {
            let mut gates = self.gates.lock().await;
            gates
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = gate.lock().await;

        if let Some(state) = self.cached_state(source, &key).await {
            return state;
        }

        let outcome = match self.provider.fetch_widget_data(source, config).await {
            Ok(data) => FetchOutcome::Data(data),
            Err(error) => {
                tracing::warn!(source_id = %source.id, error = %error, "widget data fetch failed");
                FetchOutcome::Failed(error.to_string())
            }
        };

        let entry = CacheEntry {
            outcome,
            fetched_at: Utc::now(),
        };
        let state = entry_state(&entry);
        self.cache.lock().await.insert(key.clone(), entry);
        self.gates.lock().await.remove(&key);
        state
    }

    async fn cached_state(&self, source: &DataSourceDescriptor, key: &str) -> Option<WidgetDataState> {
        let cache = self.cache.lock().await;
        let entry = cache.get(key)?;
        let age = Utc::now()
            .signed_duration_since(entry.fetched_at)
            .num_seconds();
        let valid_for = match entry.outcome {
            FetchOutcome::Data(_) => source.cache_duration_seconds,
            // Failed fetches are retried on the refresh cadence, not hammered
            // on every render pass.
            FetchOutcome::Failed(_) => source.refresh_interval_seconds,
        };
        if age < valid_for {
            Some(entry_state(entry))
        } else {
            None
        }
    }
}

fn entry_state(entry: &CacheEntry) -> WidgetDataState {
    match &entry.outcome {
        FetchOutcome::Data(data) => WidgetDataState::ready(data.clone()),
        FetchOutcome::Failed(message) => WidgetDataState::failed(message.clone()),
    }
}

fn fetch_key(source: &DataSourceDescriptor, config: &Map<String, Value>) -> String {
    let mut relevant: Vec<(&str, &Value)> = RELEVANT_CONFIG_KEYS
        .iter()
        .filter_map(|key| config.get(*key).map(|value| (*key, value)))
        .collect();
    relevant.sort_by_key(|(key, _)| *key);
    let qualifier: Vec<String> = relevant
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    format!("{}::{}", source.id, qualifier.join("&"))
}
