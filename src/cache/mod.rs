#[cfg(test)]
mod memory;
mod redis_store;

pub use redis_store::RedisStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::errors::CacheError;

const TTL: u64 = 60 * 60; // 1 hour, per the §4.4 contract
const MAX_SIZE: usize = 8 * 1024 * 1024; // 8 MiB

/// Minimal key/value seam the cache store is built on. Production code is backed
/// by Redis (`RedisStore`); tests use `MemoryStore` so chunking/versioning/eviction
/// can be exercised without a live server.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError>;
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub index: u32,
    pub timestamp: String,
    #[serde(rename = "dataPoints")]
    pub data_points: usize,
    #[serde(rename = "runName")]
    pub run_name: Option<String>,
    #[serde(rename = "dataTime")]
    pub data_time: Option<String>,
    #[serde(rename = "hoursBack")]
    pub hours_back: Option<i64>,
    #[serde(rename = "forecastOffset")]
    pub forecast_offset: Option<i32>,
    #[serde(rename = "runAge")]
    pub run_age: Option<i64>,
}

/// Versioned, chunking key/value store. Generic over the `KvStore` backend so
/// the same chunking/versioning logic runs against Redis in production and an
/// in-memory map in tests.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn KvStore>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self { backend }
    }

    /// Store `value` at `key`, chunking automatically if it exceeds `MAX_SIZE`.
    pub async fn set_json(&self, key: &str, value: &serde_json::Value) -> Result<(), CacheError> {
        let data_string = serde_json::to_string(value)?;
        let data_size = data_string.len();

        if data_size <= MAX_SIZE {
            self.backend.set_ex(key, data_string, TTL).await?;
            return Ok(());
        }

        if let Some(arr) = value.as_array() {
            self.store_chunked_array(arr, key).await
        } else if let Some(obj) = value.as_object() {
            if let Some(points) = obj.get("points").and_then(|p| p.as_array()) {
                self.store_chunked_object(obj, points, key).await
            } else {
                Err(CacheError::ValueTooLarge { size: data_size })
            }
        } else {
            Err(CacheError::ValueTooLarge { size: data_size })
        }
    }

    async fn store_chunked_array(
        &self,
        arr: &[serde_json::Value],
        key: &str,
    ) -> Result<(), CacheError> {
        let data_string = serde_json::to_string(arr)?;
        let data_size = data_string.len();

        let num_chunks = (data_size as f64 / MAX_SIZE as f64).ceil();
        let chunk_size = (arr.len() as f64 / num_chunks).ceil() as usize;
        let chunks: Vec<&[serde_json::Value]> = arr.chunks(chunk_size.max(1)).collect();

        info!(
            "cache: array too large ({} bytes), splitting into {} chunks for '{}'",
            data_size,
            chunks.len(),
            key
        );

        self.backend
            .set_ex(&format!("{key}:chunks"), chunks.len().to_string(), TTL)
            .await?;

        for (i, chunk) in chunks.iter().enumerate() {
            let chunk_string = serde_json::to_string(chunk)?;
            self.backend
                .set_ex(&format!("{key}:chunk:{i}"), chunk_string, TTL)
                .await?;
        }

        Ok(())
    }

    async fn store_chunked_object(
        &self,
        obj: &serde_json::Map<String, serde_json::Value>,
        points: &[serde_json::Value],
        key: &str,
    ) -> Result<(), CacheError> {
        let data_string = serde_json::to_string(obj)?;
        let data_size = data_string.len();

        let num_chunks = (data_size as f64 / MAX_SIZE as f64).ceil();
        let chunk_size = (points.len() as f64 / num_chunks).ceil() as usize;
        let chunks: Vec<&[serde_json::Value]> = points.chunks(chunk_size.max(1)).collect();

        let mut meta = obj.clone();
        meta.remove("points");

        info!(
            "cache: object with {} points too large ({} bytes), splitting into {} chunks for '{}'",
            points.len(),
            data_size,
            chunks.len(),
            key
        );

        self.backend
            .set_ex(&format!("{key}:meta"), serde_json::to_string(&meta)?, TTL)
            .await?;
        self.backend
            .set_ex(&format!("{key}:chunks"), chunks.len().to_string(), TTL)
            .await?;

        for (i, chunk) in chunks.iter().enumerate() {
            let chunk_string = serde_json::to_string(chunk)?;
            self.backend
                .set_ex(&format!("{key}:chunk:{i}"), chunk_string, TTL)
                .await?;
        }

        Ok(())
    }

    /// Read a value written by `set_json`, reassembling chunks transparently.
    pub async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let chunk_count = self.backend.get(&format!("{key}:chunks")).await?;

        let Some(chunk_count_str) = chunk_count else {
            return match self.backend.get(key).await? {
                Some(s) => Ok(Some(serde_json::from_str(&s)?)),
                None => Ok(None),
            };
        };

        let num_chunks: usize = chunk_count_str
            .parse()
            .map_err(|_| CacheError::Backend(format!("corrupt chunk count at '{key}:chunks'")))?;

        let meta_data = self.backend.get(&format!("{key}:meta")).await?;

        let mut points = Vec::new();
        for i in 0..num_chunks {
            if let Some(chunk_str) = self.backend.get(&format!("{key}:chunk:{i}")).await? {
                let chunk: Vec<serde_json::Value> = serde_json::from_str(&chunk_str)?;
                points.extend(chunk);
            }
        }

        if let Some(meta_str) = meta_data {
            let mut metadata: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(&meta_str)?;
            metadata.insert("points".to_string(), serde_json::json!(points));
            Ok(Some(serde_json::Value::Object(metadata)))
        } else {
            Ok(Some(serde_json::json!(points)))
        }
    }

    pub async fn set_binary(&self, key: &str, buffer: &[u8]) -> Result<(), CacheError> {
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, buffer);
        self.backend.set_ex(key, encoded, TTL).await
    }

    pub async fn get_binary(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self.backend.get(key).await? {
            Some(encoded) => {
                let decoded =
                    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &encoded)
                        .map_err(|e| CacheError::Backend(e.to_string()))?;
                Ok(Some(decoded))
            }
            None => Ok(None),
        }
    }

    /// Store `value` under a fresh integer index, evicting oldest entries past
    /// `max_history`. Does not touch the "latest" (unindexed) alias — callers
    /// decide when that alias should be overwritten (see §4.5).
    pub async fn set_versioned(
        &self,
        base_key: &str,
        value: &serde_json::Value,
        max_history: usize,
    ) -> Result<u32, CacheError> {
        let current_index: u32 = self
            .backend
            .get(&format!("{base_key}:current_index"))
            .await?
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let mut indices = self.list_indices_raw(base_key).await?;

        self.set_json(&format!("{base_key}:{current_index}"), value)
            .await?;

        indices.push(IndexEntry {
            index: current_index,
            timestamp: chrono::Utc::now().to_rfc3339(),
            data_points: count_points(value),
            run_name: value.get("runName").and_then(|v| v.as_str()).map(String::from),
            data_time: value.get("dataTime").and_then(|v| v.as_str()).map(String::from),
            hours_back: value.get("hoursBack").and_then(|v| v.as_i64()),
            forecast_offset: value
                .get("forecastOffset")
                .and_then(|v| v.as_i64())
                .map(|v| v as i32),
            run_age: value.get("runAge").and_then(|v| v.as_i64()),
        });

        if indices.len() > max_history {
            let evicted: Vec<_> = indices.drain(..indices.len() - max_history).collect();
            for entry in evicted {
                self.delete_indexed(base_key, entry.index).await?;
            }
        }

        self.backend
            .set_ex(
                &format!("{base_key}:indices"),
                serde_json::to_string(&indices)?,
                TTL,
            )
            .await?;
        self.backend
            .set_ex(
                &format!("{base_key}:current_index"),
                (current_index + 1).to_string(),
                TTL,
            )
            .await?;

        Ok(current_index)
    }

    pub async fn set_binary_versioned(
        &self,
        base_key: &str,
        buffer: &[u8],
        index: u32,
    ) -> Result<(), CacheError> {
        self.set_binary(&format!("{base_key}:{index}"), buffer).await?;
        self.set_binary(base_key, buffer).await
    }

    pub async fn get_by_index(
        &self,
        base_key: &str,
        index: u32,
    ) -> Result<Option<serde_json::Value>, CacheError> {
        self.get_json(&format!("{base_key}:{index}")).await
    }

    pub async fn get_binary_by_index(
        &self,
        base_key: &str,
        index: u32,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        self.get_binary(&format!("{base_key}:{index}")).await
    }

    /// Indices for `base_key`, sorted by `data_time` descending (most recent first).
    pub async fn list_indices(&self, base_key: &str) -> Result<Vec<IndexEntry>, CacheError> {
        let mut indices = self.list_indices_raw(base_key).await?;
        indices.sort_by_key(|b| std::cmp::Reverse(data_time_ms(b)));
        Ok(indices)
    }

    async fn list_indices_raw(&self, base_key: &str) -> Result<Vec<IndexEntry>, CacheError> {
        match self.backend.get(&format!("{base_key}:indices")).await? {
            Some(s) => Ok(serde_json::from_str(&s)?),
            None => Ok(Vec::new()),
        }
    }

    async fn delete_indexed(&self, base_key: &str, index: u32) -> Result<(), CacheError> {
        let key = format!("{base_key}:{index}");

        if let Some(chunk_count_str) = self.backend.get(&format!("{key}:chunks")).await? {
            if let Ok(num_chunks) = chunk_count_str.parse::<usize>() {
                for i in 0..num_chunks {
                    self.backend.del(&format!("{key}:chunk:{i}")).await?;
                }
            }
            self.backend.del(&format!("{key}:chunks")).await?;
            self.backend.del(&format!("{key}:meta")).await?;
        }

        self.backend.del(&key).await
    }
}

fn count_points(value: &serde_json::Value) -> usize {
    if let Some(arr) = value.as_array() {
        arr.len()
    } else if let Some(obj) = value.as_object() {
        obj.get("points")
            .and_then(|p| p.as_array())
            .map(|a| a.len())
            .unwrap_or(0)
    } else {
        0
    }
}

fn data_time_ms(entry: &IndexEntry) -> i64 {
    entry
        .data_time
        .as_ref()
        .and_then(|dt| chrono::DateTime::parse_from_rfc3339(dt).ok())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryStore;

    fn store() -> CacheStore {
        CacheStore::new(Arc::new(MemoryStore::new()))
    }

    fn payload_with_points(run_name: &str, forecast_offset: i32, num_points: usize) -> serde_json::Value {
        let points: Vec<serde_json::Value> = (0..num_points)
            .map(|i| serde_json::json!({"lat": i, "lon": i, "u": 1.0, "v": 1.0}))
            .collect();

        serde_json::json!({
            "runName": run_name,
            "forecastOffset": forecast_offset,
            "dataTime": chrono::Utc::now().to_rfc3339(),
            "points": points,
        })
    }

    // S3: a payload whose serialized size exceeds MAX_SIZE chunks into several
    // pieces, with the metadata stored separately and the points reassembled
    // exactly on read.
    #[tokio::test]
    async fn test_chunking_threshold_round_trips_large_payload() {
        let cache = store();
        // ~40 bytes/point * 300_000 points comfortably exceeds the 8 MiB threshold.
        let payload = payload_with_points("20260121_00Z", 0, 300_000);
        let original_points = payload.get("points").unwrap().as_array().unwrap().clone();

        cache.set_json("wind:points", &payload).await.unwrap();

        let chunk_count: usize = cache
            .backend
            .get("wind:points:chunks")
            .await
            .unwrap()
            .unwrap()
            .parse()
            .unwrap();
        assert!(chunk_count > 1, "expected payload to be split into multiple chunks");

        let meta = cache.backend.get("wind:points:meta").await.unwrap();
        assert!(meta.is_some());
        let meta: serde_json::Value = serde_json::from_str(&meta.unwrap()).unwrap();
        assert!(meta.get("points").is_none());
        assert_eq!(meta.get("runName").unwrap(), "20260121_00Z");

        let reassembled = cache.get_json("wind:points").await.unwrap().unwrap();
        assert_eq!(reassembled.get("points").unwrap().as_array().unwrap(), &original_points);
    }

    // S4: after 22 distinct versioned writes with max_history=20, only the 20
    // most recent indices remain and the evicted keys read back as nil.
    #[tokio::test]
    async fn test_history_eviction_keeps_last_20() {
        let cache = store();

        for i in 0..22 {
            let payload = payload_with_points(&format!("run-{i}"), i, 1);
            cache.set_versioned("wind:points", &payload, 20).await.unwrap();
        }

        let indices = cache.list_indices_raw("wind:points").await.unwrap();
        assert_eq!(indices.len(), 20);

        // indices 0 and 1 were evicted; their data keys must be gone.
        assert!(cache.get_by_index("wind:points", 0).await.unwrap().is_none());
        assert!(cache.get_by_index("wind:points", 1).await.unwrap().is_none());
        assert!(cache.get_by_index("wind:points", 21).await.unwrap().is_some());

        let run_names: Vec<_> = indices.iter().filter_map(|e| e.run_name.clone()).collect();
        assert!(!run_names.contains(&"run-0".to_string()));
        assert!(!run_names.contains(&"run-1".to_string()));
        assert!(run_names.contains(&"run-21".to_string()));
    }

    // Property 3: current_index strictly increases and is never reused across writes.
    #[tokio::test]
    async fn test_current_index_is_monotonic() {
        let cache = store();

        let mut seen = Vec::new();
        for i in 0..5 {
            let payload = payload_with_points(&format!("run-{i}"), i, 1);
            let idx = cache.set_versioned("wind:points", &payload, 20).await.unwrap();
            seen.push(idx);
        }

        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    // Latest alias policy (property 8): set_json on the base key only happens
    // when the caller explicitly decides to (scheduler's is_latest gate);
    // set_versioned alone must never touch it.
    #[tokio::test]
    async fn test_set_versioned_does_not_touch_latest_alias() {
        let cache = store();
        let payload = payload_with_points("20260121_00Z", 3, 1);

        cache.set_versioned("wind:points", &payload, 20).await.unwrap();

        assert!(cache.get_json("wind:points").await.unwrap().is_none());
    }

    // set_binary_versioned writes the indexed key and the unindexed ("latest")
    // alias unconditionally, unlike set_versioned's JSON path.
    #[tokio::test]
    async fn test_set_binary_versioned_writes_both_indexed_and_latest() {
        let cache = store();
        let buffer = vec![1u8, 2, 3, 4];

        cache.set_binary_versioned("wind:png", &buffer, 7).await.unwrap();

        assert_eq!(cache.get_binary_by_index("wind:png", 7).await.unwrap(), Some(buffer.clone()));
        assert_eq!(cache.get_binary("wind:png").await.unwrap(), Some(buffer));
    }
}
