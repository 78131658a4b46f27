use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shared::{
    domain::AccountAddress,
    protocol::{EntryFunctionPayload, PendingTransaction},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet account connected")]
    Disconnected,
    #[error("invalid wallet url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("wallet request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("wallet refused the transaction ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Connected signer: reports the active account and signs and submits
/// entry function payloads on its behalf.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    async fn account(&self) -> Result<Option<AccountAddress>, WalletError>;
    async fn sign_and_submit(
        &self,
        payload: &EntryFunctionPayload,
    ) -> Result<PendingTransaction, WalletError>;
}

pub struct MissingWallet;

#[async_trait]
impl WalletConnector for MissingWallet {
    async fn account(&self) -> Result<Option<AccountAddress>, WalletError> {
        Ok(None)
    }

    async fn sign_and_submit(
        &self,
        _payload: &EntryFunctionPayload,
    ) -> Result<PendingTransaction, WalletError> {
        Err(WalletError::Disconnected)
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    address: Option<AccountAddress>,
}

/// Wallet reached over a local HTTP signing service.
pub struct HttpWalletBridge {
    http: Client,
    base_url: Url,
}

impl HttpWalletBridge {
    pub fn new(base_url: &str) -> Result<Self, WalletError> {
        Ok(Self {
            http: Client::new(),
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, WalletError> {
        self.base_url
            .join(path)
            .map_err(|e| WalletError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl WalletConnector for HttpWalletBridge {
    async fn account(&self) -> Result<Option<AccountAddress>, WalletError> {
        let res = self.http.get(self.endpoint("account")?).send().await?;
        if res.status() == StatusCode::NOT_FOUND {
            debug!("wallet reports no connected account");
            return Ok(None);
        }
        let body: AccountResponse = res.error_for_status()?.json().await?;
        Ok(body.address)
    }

    async fn sign_and_submit(
        &self,
        payload: &EntryFunctionPayload,
    ) -> Result<PendingTransaction, WalletError> {
        let res = self
            .http
            .post(self.endpoint("sign_and_submit")?)
            .json(payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            warn!(function = %payload.function, %status, "wallet rejected transaction");
            return Err(WalletError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(res.json().await?)
    }
}

/// Parses `raw` and guarantees a trailing slash so relative joins append.
pub fn normalize_base_url(raw: &str) -> Result<Url, WalletError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| WalletError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
