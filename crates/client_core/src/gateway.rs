use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{AccountAddress, TableHandle},
    error::{ApiError, LedgerError},
    protocol::{
        AccountResource, PendingTransaction, TableItemRequest, TransactionInfo, TransactionRecord,
    },
};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Absence of a resource or table item is [`LedgerError::NotFound`].
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn account_resource(
        &self,
        owner: &AccountAddress,
        resource_type: &str,
    ) -> Result<AccountResource, LedgerError>;
    async fn table_item(
        &self,
        handle: &TableHandle,
        request: &TableItemRequest,
    ) -> Result<Value, LedgerError>;
    async fn wait_for_transaction(
        &self,
        pending: &PendingTransaction,
    ) -> Result<TransactionInfo, LedgerError>;
}

pub struct MissingLedgerGateway;

#[async_trait]
impl LedgerGateway for MissingLedgerGateway {
    async fn account_resource(
        &self,
        owner: &AccountAddress,
        resource_type: &str,
    ) -> Result<AccountResource, LedgerError> {
        Err(LedgerError::Transport(format!(
            "ledger unavailable for {resource_type} of {owner}"
        )))
    }

    async fn table_item(
        &self,
        handle: &TableHandle,
        _request: &TableItemRequest,
    ) -> Result<Value, LedgerError> {
        Err(LedgerError::Transport(format!(
            "ledger unavailable for table {handle}"
        )))
    }

    async fn wait_for_transaction(
        &self,
        pending: &PendingTransaction,
    ) -> Result<TransactionInfo, LedgerError> {
        Err(LedgerError::Transport(format!(
            "ledger unavailable for transaction {}",
            pending.hash
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayOptions {
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// REST client for a ledger full node (`/v1` API root).
pub struct HttpLedgerGateway {
    http: Client,
    node_url: Url,
    options: GatewayOptions,
}

impl HttpLedgerGateway {
    pub fn new(node_url: &str, options: GatewayOptions) -> Result<Self, LedgerError> {
        let mut node_url = Url::parse(node_url.trim())
            .map_err(|e| LedgerError::Transport(format!("invalid node url '{node_url}': {e}")))?;
        if !node_url.path().ends_with('/') {
            let path = format!("{}/", node_url.path());
            node_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            node_url,
            options,
        })
    }

    pub fn node_url(&self) -> &Url {
        &self.node_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, LedgerError> {
        self.node_url
            .join(path)
            .map_err(|e| LedgerError::Transport(format!("invalid ledger path '{path}': {e}")))
    }

    async fn fetch_transaction(&self, hash: &str) -> Result<TransactionRecord, LedgerError> {
        let res = self
            .http
            .get(self.endpoint(&format!("transactions/by_hash/{hash}"))?)
            .send()
            .await
            .map_err(transport)?;
        decode(res).await
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn account_resource(
        &self,
        owner: &AccountAddress,
        resource_type: &str,
    ) -> Result<AccountResource, LedgerError> {
        let res = self
            .http
            .get(self.endpoint(&format!("accounts/{owner}/resource/{resource_type}"))?)
            .send()
            .await
            .map_err(transport)?;
        decode(res).await
    }

    async fn table_item(
        &self,
        handle: &TableHandle,
        request: &TableItemRequest,
    ) -> Result<Value, LedgerError> {
        let res = self
            .http
            .post(self.endpoint(&format!("tables/{handle}/item"))?)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        decode(res).await
    }

    async fn wait_for_transaction(
        &self,
        pending: &PendingTransaction,
    ) -> Result<TransactionInfo, LedgerError> {
        let started = Instant::now();
        loop {
            match self.fetch_transaction(&pending.hash).await {
                Ok(record) if !record.is_pending() => {
                    let vm_status = record.vm_status.unwrap_or_default();
                    if record.success != Some(true) {
                        warn!(hash = %pending.hash, %vm_status, "transaction committed without success");
                        return Err(LedgerError::Rejected {
                            hash: pending.hash.clone(),
                            vm_status,
                        });
                    }
                    info!(hash = %pending.hash, version = ?record.version, "transaction confirmed");
                    return Ok(TransactionInfo {
                        hash: record.hash,
                        version: record.version,
                        vm_status,
                    });
                }
                Ok(_) => debug!(hash = %pending.hash, "transaction still pending"),
                // The node may not have indexed a freshly submitted hash yet.
                Err(LedgerError::NotFound(_)) => {
                    debug!(hash = %pending.hash, "transaction not yet visible")
                }
                Err(err) => return Err(err),
            }

            let waited = started.elapsed();
            if waited >= self.options.confirmation_timeout {
                return Err(LedgerError::Timeout {
                    hash: pending.hash.clone(),
                    waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                });
            }
            sleep(self.options.poll_interval).await;
        }
    }
}

fn transport(err: reqwest::Error) -> LedgerError {
    LedgerError::Transport(err.to_string())
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, LedgerError> {
    let status = res.status();
    let body = res.text().await.map_err(transport)?;
    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| LedgerError::Decode(e.to_string()));
    }
    Err(error_from_body(status, &body))
}

fn error_from_body(status: StatusCode, body: &str) -> LedgerError {
    match serde_json::from_str::<ApiError>(body) {
        Ok(error) if status == StatusCode::NOT_FOUND || error.error_code.is_absence() => {
            LedgerError::NotFound(error.message)
        }
        Ok(error) => LedgerError::Api {
            status: status.as_u16(),
            error,
        },
        Err(_) if status == StatusCode::NOT_FOUND => LedgerError::NotFound(body.to_string()),
        Err(_) => LedgerError::Transport(format!("ledger returned {status}: {body}")),
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
