use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::connection::{Connection, ConnectionFactory, ConnectionParams, SharedConnection};
use crate::{JobId, JobRecord, QueueError, QueueResult};

const QUEUE_KEY_PREFIX: &str = "rq:queue:";

fn queue_key(queue: &str) -> String {
    format!("{QUEUE_KEY_PREFIX}{queue}")
}

/// Builds pooled Redis handles
#[derive(Debug, Default, Clone, Copy)]
pub struct RedisConnectionFactory;

impl RedisConnectionFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ConnectionFactory for RedisConnectionFactory {
    fn name(&self) -> &str {
        "redis"
    }

    fn connect(&self, params: &ConnectionParams) -> QueueResult<SharedConnection> {
        let url = params.to_url("redis")?;
        Ok(Arc::new(RedisConnection::open(params.clone(), &url)?))
    }

    fn from_url(&self, url: &str) -> QueueResult<SharedConnection> {
        let params = ConnectionParams::from_url(url)?;
        Ok(Arc::new(RedisConnection::open(params, url)?))
    }
}

/// Redis handle.
///
/// Opening only validates the URL; the multiplexed [`ConnectionManager`]
/// is created on first use and reconnects on its own afterwards.
pub struct RedisConnection {
    params: ConnectionParams,
    client: Client,
    manager: OnceCell<ConnectionManager>,
}

impl RedisConnection {
    pub fn open(params: ConnectionParams, url: &str) -> QueueResult<Self> {
        let client = Client::open(url)
            .map_err(|e| QueueError::InvalidConnection(format!("{url}: {e}")))?;
        Ok(Self {
            params,
            client,
            manager: OnceCell::new(),
        })
    }

    async fn manager(&self) -> QueueResult<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                debug!(address = %self.params.address(), "opening redis connection manager");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;
        Ok(manager.clone())
    }
}

impl fmt::Debug for RedisConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConnection")
            .field("address", &self.params.address())
            .field("connected", &self.manager.initialized())
            .finish()
    }
}

#[async_trait]
impl Connection for RedisConnection {
    fn params(&self) -> &ConnectionParams {
        &self.params
    }

    #[instrument(skip(self), fields(address = %self.params.address()))]
    async fn push_job(&self, queue: &str, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.manager().await?;
        conn.lpush::<_, _, ()>(queue_key(queue), job_id.as_str()).await?;
        Ok(())
    }

    async fn pop_job(&self, queues: &[&str]) -> QueueResult<Option<(String, JobId)>> {
        let mut conn = self.manager().await?;
        for queue in queues {
            let popped: Option<String> = conn.rpop(queue_key(queue), None).await?;
            if let Some(id) = popped {
                return Ok(Some((queue.to_string(), JobId::from(id))));
            }
        }
        Ok(None)
    }

    async fn save_job(&self, record: &JobRecord, ttl: Option<Duration>) -> QueueResult<()> {
        let mut conn = self.manager().await?;
        let body = serde_json::to_string(record)?;
        let key = record.job_id.key();
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, body, ttl.as_secs().max(1)).await?,
            None => conn.set::<_, _, ()>(key, body).await?,
        }
        Ok(())
    }

    async fn fetch_job(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        let mut conn = self.manager().await?;
        let body: Option<String> = conn.get(job_id.key()).await?;
        body.map(|b| serde_json::from_str(&b).map_err(QueueError::from))
            .transpose()
    }

    async fn queue_len(&self, queue: &str) -> QueueResult<usize> {
        let mut conn = self.manager().await?;
        Ok(conn.llen(queue_key(queue)).await?)
    }

    async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.manager().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_does_not_touch_the_network() {
        let factory = RedisConnectionFactory::new();
        let conn = factory.from_url("redis://127.0.0.1:1/3").unwrap();
        assert_eq!(conn.params().db, 3);
        assert_eq!(conn.params().port, 1);
    }

    #[test]
    fn queue_keys_are_namespaced() {
        assert_eq!(queue_key("low"), "rq:queue:low");
    }
}
