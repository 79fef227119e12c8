//! Socket Store Adapter
//!
//! Direct connection to a Redis-compatible server through a reconnecting
//! `ConnectionManager`.

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{PipelineOp, RemoteStore};
use crate::error::Result;

// == Socket Store ==
#[derive(Clone)]
pub struct SocketStore {
    conn: ConnectionManager,
}

impl fmt::Debug for SocketStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketStore").finish_non_exhaustive()
    }
}

impl SocketStore {
    /// Opens the connection; fails fast on a malformed URL or unreachable server.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl RemoteStore for SocketStore {
    fn kind(&self) -> &'static str {
        "socket"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
        Ok(values)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn exec_pipeline(&self, ops: Vec<PipelineOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for op in &ops {
            match op.ttl_seconds {
                Some(ttl) => {
                    pipe.set_ex(&op.key, &op.value, ttl).ignore();
                }
                None => {
                    pipe.set(&op.key, &op.value).ignore();
                }
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
