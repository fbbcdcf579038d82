//! 内存缓存实现（用于测试与占位）。
//!
//! 版本令牌由单调递增计数器生成。读操作按调用计数，
//! 测试可据此断言一次解析发出了多少次缓存往返。

use crate::error::CacheError;
use crate::models::{CacheStats, CacheVersion, VersionedValue};
use crate::traits::RemoteCache;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone)]
struct Entry {
    value: String,
    version: u64,
}

pub struct InMemoryRemoteCache {
    entries: RwLock<HashMap<String, Entry>>,
    version_counter: AtomicU64,
    read_ops: AtomicU64,
    write_ops: AtomicU64,
}

impl InMemoryRemoteCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            version_counter: AtomicU64::new(0),
            read_ops: AtomicU64::new(0),
            write_ops: AtomicU64::new(0),
        }
    }

    /// 读操作计数（get / get_all / get_with_version 各记一次）。
    pub fn read_ops(&self) -> u64 {
        self.read_ops.load(Ordering::Relaxed)
    }

    /// 写操作计数（put / remove_with_version 各记一次）。
    pub fn write_ops(&self) -> u64 {
        self.write_ops.load(Ordering::Relaxed)
    }

    /// 计数清零（测试在准备数据后调用）。
    pub fn reset_ops(&self) {
        self.read_ops.store(0, Ordering::Relaxed);
        self.write_ops.store(0, Ordering::Relaxed);
    }
}

impl Default for InMemoryRemoteCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RemoteCache for InMemoryRemoteCache {
    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.write_ops.fetch_add(1, Ordering::Relaxed);
        let version = self.version_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut map = self
            .entries
            .write()
            .map_err(|_| CacheError::new("lock failed"))?;
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                version,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.read_ops.fetch_add(1, Ordering::Relaxed);
        let map = self
            .entries
            .read()
            .map_err(|_| CacheError::new("lock failed"))?;
        Ok(map.get(key).map(|entry| entry.value.clone()))
    }

    async fn get_all(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheError> {
        self.read_ops.fetch_add(1, Ordering::Relaxed);
        let map = self
            .entries
            .read()
            .map_err(|_| CacheError::new("lock failed"))?;
        let mut result = HashMap::new();
        for key in keys {
            if let Some(entry) = map.get(key) {
                result.insert(key.clone(), entry.value.clone());
            }
        }
        Ok(result)
    }

    async fn get_with_version(&self, key: &str) -> Result<Option<VersionedValue>, CacheError> {
        self.read_ops.fetch_add(1, Ordering::Relaxed);
        let map = self
            .entries
            .read()
            .map_err(|_| CacheError::new("lock failed"))?;
        Ok(map.get(key).map(|entry| VersionedValue {
            value: entry.value.clone(),
            version: CacheVersion::new(entry.version.to_string()),
        }))
    }

    async fn remove_with_version(
        &self,
        key: &str,
        version: &CacheVersion,
    ) -> Result<bool, CacheError> {
        self.write_ops.fetch_add(1, Ordering::Relaxed);
        let mut map = self
            .entries
            .write()
            .map_err(|_| CacheError::new("lock failed"))?;
        match map.get(key) {
            Some(entry) if entry.version.to_string() == version.as_str() => {
                map.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn check_availability(&self) -> Result<CacheStats, CacheError> {
        let map = self
            .entries
            .read()
            .map_err(|_| CacheError::new("lock failed"))?;
        let mut details = HashMap::new();
        details.insert("backend".to_string(), "memory".to_string());
        details.insert("keys".to_string(), map.len().to_string());
        Ok(CacheStats { details })
    }
}
