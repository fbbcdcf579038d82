//! Redis 远程缓存实现
//!
//! 条目以 JSON 信封落盘，信封内携带写入时生成的版本令牌；
//! 条件删除通过服务端 Lua 脚本完成，保证比较与删除的原子性。

use crate::error::CacheError;
use crate::models::{CacheStats, CacheVersion, VersionedValue};
use crate::traits::RemoteCache;
use redis::AsyncCommands;
use std::collections::HashMap;

/// 条目信封：值与版本一同存储。
#[derive(serde::Serialize, serde::Deserialize)]
struct EntryPayload {
    value: String,
    version: String,
}

/// 版本匹配才删除。不存在或版本不一致时不做任何修改。
const REMOVE_IF_VERSION_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
  return 0
end
local ok, entry = pcall(cjson.decode, raw)
if not ok then
  return 0
end
if entry.version == ARGV[1] then
  redis.call('DEL', KEYS[1])
  return 1
end
return 0
"#;

/// Redis 远程缓存
pub struct RedisRemoteCache {
    client: redis::Client,
}

impl RedisRemoteCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client))
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        Ok(self.client.get_multiplexed_tokio_connection().await?)
    }
}

#[async_trait::async_trait]
impl RemoteCache for RedisRemoteCache {
    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut connection = self.connection().await?;
        let payload = EntryPayload {
            value: value.to_string(),
            version: uuid::Uuid::new_v4().to_string(),
        };
        let data = serde_json::to_string(&payload)?;
        connection.set::<_, _, ()>(key, data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection().await?;
        let data: Option<String> = connection.get(key).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        let payload: EntryPayload = serde_json::from_str(&data)?;
        Ok(Some(payload.value))
    }

    async fn get_all(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let mut connection = self.connection().await?;
        let values: Vec<Option<String>> = connection.mget(keys).await?;
        let mut result = HashMap::new();
        for (key, value) in keys.iter().zip(values.into_iter()) {
            let Some(value) = value else { continue };
            let payload: EntryPayload = match serde_json::from_str(&value) {
                Ok(payload) => payload,
                Err(_) => continue,
            };
            result.insert(key.clone(), payload.value);
        }
        Ok(result)
    }

    async fn get_with_version(&self, key: &str) -> Result<Option<VersionedValue>, CacheError> {
        let mut connection = self.connection().await?;
        let data: Option<String> = connection.get(key).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        let payload: EntryPayload = serde_json::from_str(&data)?;
        Ok(Some(VersionedValue {
            value: payload.value,
            version: CacheVersion::new(payload.version),
        }))
    }

    async fn remove_with_version(
        &self,
        key: &str,
        version: &CacheVersion,
    ) -> Result<bool, CacheError> {
        let mut connection = self.connection().await?;
        let removed: i64 = redis::cmd("EVAL")
            .arg(REMOVE_IF_VERSION_SCRIPT)
            .arg(1)
            .arg(key)
            .arg(version.as_str())
            .query_async(&mut connection)
            .await?;
        Ok(removed == 1)
    }

    async fn check_availability(&self) -> Result<CacheStats, CacheError> {
        let mut connection = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut connection).await?;
        let keys: i64 = redis::cmd("DBSIZE").query_async(&mut connection).await?;
        let mut details = HashMap::new();
        details.insert("backend".to_string(), "redis".to_string());
        details.insert("ping".to_string(), pong);
        details.insert("keys".to_string(), keys.to_string());
        Ok(CacheStats { details })
    }
}
