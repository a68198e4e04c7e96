use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use tokio::sync::Mutex;
use vantage_types::{Counters, RunState, RunStateKind, VantageError, VantageResult};

use crate::{ScoredUrl, StateStore};

/// Atomically: skip any url already in `visited`, otherwise `ZADD` it into
/// `frontier` at the given score. KEYS = [frontier, visited]; ARGV = pairs of
/// (score, url) flattened.
const ADD_URLS_SCRIPT: &str = r#"
local frontier = KEYS[1]
local visited = KEYS[2]
for i = 1, #ARGV, 2 do
    local score = ARGV[i]
    local url = ARGV[i + 1]
    if redis.call('SISMEMBER', visited, url) == 0 then
        redis.call('ZADD', frontier, score, url)
    end
end
return 1
"#;

/// Atomically pop the highest-scoring frontier member and mark it visited.
/// KEYS = [frontier, visited]. Returns the url or an empty string.
const POP_NEXT_URL_SCRIPT: &str = r#"
local frontier = KEYS[1]
local visited = KEYS[2]
local popped = redis.call('ZPOPMAX', frontier)
if #popped == 0 then
    return ''
end
local url = popped[1]
redis.call('SADD', visited, url)
return url
"#;

fn frontier_key(prefix: &str, crawl_id: &str) -> String {
    format!("{prefix}:crawl:{crawl_id}:frontier")
}
fn visited_key(prefix: &str, crawl_id: &str) -> String {
    format!("{prefix}:crawl:{crawl_id}:visited")
}
fn states_key(prefix: &str, crawl_id: &str) -> String {
    format!("{prefix}:crawl:{crawl_id}:states")
}
fn counters_key(prefix: &str, crawl_id: &str) -> String {
    format!("{prefix}:crawl:{crawl_id}:counters")
}
fn exists_key(prefix: &str, crawl_id: &str) -> String {
    format!("{prefix}:crawl:{crawl_id}:exists")
}

fn transport_err(err: redis::RedisError) -> VantageError {
    VantageError::BackendUnavailable(err.to_string())
}

/// Redis-backed state store. Each crawl's frontier/visited/history/counters
/// live under `<prefix>:crawl:<id>:<suffix>` keys; multi-step operations run
/// as server-side Lua scripts so they stay atomic without a client-side lock.
pub struct RedisStateStore {
    conn: Arc<Mutex<MultiplexedConnection>>,
    prefix: String,
    add_urls_script: Script,
    pop_next_url_script: Script,
}

impl RedisStateStore {
    pub async fn connect(connection_url: &str, prefix: impl Into<String>) -> VantageResult<Self> {
        let client = Client::open(connection_url).map_err(transport_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(transport_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            prefix: prefix.into(),
            add_urls_script: Script::new(ADD_URLS_SCRIPT),
            pop_next_url_script: Script::new(POP_NEXT_URL_SCRIPT),
        })
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn create(&self, crawl_id: &str) -> VantageResult<()> {
        let mut conn = self.conn.lock().await;
        let created: bool = conn
            .set_nx(exists_key(&self.prefix, crawl_id), 1)
            .await
            .map_err(transport_err)?;
        if !created {
            return Err(VantageError::AlreadyExists(crawl_id.to_string()));
        }
        let counters = counters_key(&self.prefix, crawl_id);
        let _: () = redis::pipe()
            .hset(&counters, "crawled", 0)
            .hset(&counters, "processed", 0)
            .hset(&counters, "errors", 0)
            .query_async(&mut *conn)
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn delete(&self, crawl_id: &str) -> VantageResult<()> {
        let mut conn = self.conn.lock().await;
        let removed: i64 = conn
            .del(exists_key(&self.prefix, crawl_id))
            .await
            .map_err(transport_err)?;
        if removed == 0 {
            tracing::warn!(crawl_id, "delete called on unknown crawl");
        }
        let _: () = conn
            .del((
                frontier_key(&self.prefix, crawl_id),
                visited_key(&self.prefix, crawl_id),
                states_key(&self.prefix, crawl_id),
                counters_key(&self.prefix, crawl_id),
            ))
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn add_state(&self, crawl_id: &str, state: RunState) -> VantageResult<()> {
        let payload = serde_json::to_string(&state)
            .map_err(|e| VantageError::StorageError(e.to_string()))?;
        let mut conn = self.conn.lock().await;
        let _: () = conn
            .rpush(states_key(&self.prefix, crawl_id), payload)
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn current_state(&self, crawl_id: &str) -> VantageResult<RunStateKind> {
        let mut conn = self.conn.lock().await;
        let latest: Option<String> = conn
            .lindex(states_key(&self.prefix, crawl_id), -1)
            .await
            .map_err(transport_err)?;
        match latest {
            Some(raw) => {
                let state: RunState = serde_json::from_str(&raw)
                    .map_err(|e| VantageError::StorageError(e.to_string()))?;
                Ok(state.state)
            }
            None => Ok(RunStateKind::Created),
        }
    }

    async fn state_history(&self, crawl_id: &str) -> VantageResult<Vec<RunState>> {
        let mut conn = self.conn.lock().await;
        let raw: Vec<String> = conn
            .lrange(states_key(&self.prefix, crawl_id), 0, -1)
            .await
            .map_err(transport_err)?;
        raw.into_iter()
            .map(|s| serde_json::from_str(&s).map_err(|e| VantageError::StorageError(e.to_string())))
            .collect()
    }

    async fn add_urls(&self, crawl_id: &str, urls: Vec<ScoredUrl>) -> VantageResult<()> {
        if urls.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let mut invocation = self.add_urls_script.key(frontier_key(&self.prefix, crawl_id));
        invocation.key(visited_key(&self.prefix, crawl_id));
        for scored in &urls {
            invocation.arg(scored.score).arg(&scored.url);
        }
        invocation
            .invoke_async::<()>(&mut *conn)
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn pop_next_url(&self, crawl_id: &str) -> VantageResult<Option<String>> {
        let mut conn = self.conn.lock().await;
        let url: String = self
            .pop_next_url_script
            .key(frontier_key(&self.prefix, crawl_id))
            .key(visited_key(&self.prefix, crawl_id))
            .invoke_async(&mut *conn)
            .await
            .map_err(transport_err)?;
        Ok(if url.is_empty() { None } else { Some(url) })
    }

    async fn is_visited(&self, crawl_id: &str, url: &str) -> VantageResult<bool> {
        let mut conn = self.conn.lock().await;
        conn.sismember(visited_key(&self.prefix, crawl_id), url)
            .await
            .map_err(transport_err)
    }

    async fn inc_crawled(&self, crawl_id: &str) -> VantageResult<()> {
        let mut conn = self.conn.lock().await;
        let _: i64 = conn
            .hincr(counters_key(&self.prefix, crawl_id), "crawled", 1)
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn inc_processed(&self, crawl_id: &str) -> VantageResult<()> {
        let mut conn = self.conn.lock().await;
        let _: i64 = conn
            .hincr(counters_key(&self.prefix, crawl_id), "processed", 1)
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn inc_errors(&self, crawl_id: &str) -> VantageResult<()> {
        let mut conn = self.conn.lock().await;
        let _: i64 = conn
            .hincr(counters_key(&self.prefix, crawl_id), "errors", 1)
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn counters(&self, crawl_id: &str) -> VantageResult<Counters> {
        let mut conn = self.conn.lock().await;
        let counters_key = counters_key(&self.prefix, crawl_id);
        let (values, frontier_size): (Vec<Option<i64>>, i64) = redis::pipe()
            .cmd("HMGET")
            .arg(&counters_key)
            .arg(&["crawled", "processed", "errors"])
            .zcard(frontier_key(&self.prefix, crawl_id))
            .query_async(&mut *conn)
            .await
            .map_err(transport_err)?;
        Ok(Counters {
            crawled: values.first().copied().flatten().unwrap_or(0) as u64,
            processed: values.get(1).copied().flatten().unwrap_or(0) as u64,
            errors: values.get(2).copied().flatten().unwrap_or(0) as u64,
            frontier_size: frontier_size as usize,
        })
    }
}
