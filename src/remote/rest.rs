//! REST Store Adapter
//!
//! Talks to a managed key-value service that accepts commands as JSON arrays
//! over HTTPS, authenticated with a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{PipelineOp, RemoteStore};
use crate::error::{CacheError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One reply envelope: either `{"result": ...}` or `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl RestReply {
    fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(CacheError::Remote(error)),
            None => Ok(self.result),
        }
    }
}

// == REST Store ==
#[derive(Debug, Clone)]
pub struct RestStore {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl RestStore {
    pub fn new(url: &str, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn command(&self, args: Vec<String>) -> Result<Value> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        let reply: RestReply = response
            .json()
            .await
            .map_err(|e| CacheError::Remote(format!("HTTP {}: {}", status, e)))?;
        reply.into_result()
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    fn kind(&self) -> &'static str {
        "rest"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.command(vec!["GET".to_string(), key.to_string()]).await?;
        Ok(as_optional_string(value))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push("MGET".to_string());
        args.extend(keys.iter().cloned());

        match self.command(args).await? {
            Value::Array(values) => Ok(values.into_iter().map(as_optional_string).collect()),
            other => Err(CacheError::Remote(format!("unexpected MGET reply: {}", other))),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        self.command(set_args(key, value, ttl_seconds)).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push("DEL".to_string());
        args.extend(keys.iter().cloned());

        as_integer(self.command(args).await?).map(|n| n.max(0) as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let count = as_integer(
            self.command(vec!["EXISTS".to_string(), key.to_string()])
                .await?,
        )?;
        Ok(count > 0)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        as_integer(self.command(vec!["INCR".to_string(), key.to_string()]).await?)
    }

    async fn exec_pipeline(&self, ops: Vec<PipelineOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let commands: Vec<Vec<String>> = ops.iter().map(op_args).collect();
        let response = self
            .http
            .post(format!("{}/pipeline", self.url))
            .bearer_auth(&self.token)
            .json(&commands)
            .send()
            .await?;

        let status = response.status();
        let replies: Vec<RestReply> = response
            .json()
            .await
            .map_err(|e| CacheError::Remote(format!("HTTP {}: {}", status, e)))?;

        for reply in replies {
            reply.into_result()?;
        }
        Ok(())
    }
}

fn set_args(key: &str, value: &str, ttl_seconds: Option<u64>) -> Vec<String> {
    let mut args = vec!["SET".to_string(), key.to_string(), value.to_string()];
    if let Some(ttl) = ttl_seconds {
        args.push("EX".to_string());
        args.push(ttl.to_string());
    }
    args
}

fn op_args(op: &PipelineOp) -> Vec<String> {
    set_args(&op.key, &op.value, op.ttl_seconds)
}

fn as_optional_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn as_integer(value: Value) -> Result<i64> {
    let parsed = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| CacheError::Remote(format!("expected integer reply, got {}", value)))
}
