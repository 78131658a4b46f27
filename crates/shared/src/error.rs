use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AccountNotFound,
    ResourceNotFound,
    TableItemNotFound,
    TransactionNotFound,
    InvalidInput,
    #[serde(other)]
    Internal,
}

impl ErrorCode {
    /// Codes the node uses to report that the requested state does not exist.
    pub fn is_absence(self) -> bool {
        matches!(
            self,
            Self::AccountNotFound
                | Self::ResourceNotFound
                | Self::TableItemNotFound
                | Self::TransactionNotFound
        )
    }
}

/// Error body returned by the ledger node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    pub error_code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_error_code: Option<u64>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_code,
            vm_error_code: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("account address is empty")]
    Empty,
    #[error("account address has {len} hex digits, at most {max} allowed")]
    TooLong { len: usize, max: usize },
    #[error("account address contains non-hex character {0:?}")]
    InvalidDigit(char),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("ledger request failed: {0}")]
    Transport(String),
    #[error("ledger returned {status}: {}", .error.message)]
    Api { status: u16, error: ApiError },
    #[error("failed to decode ledger response: {0}")]
    Decode(String),
    #[error("transaction {hash} rejected: {vm_status}")]
    Rejected { hash: String, vm_status: String },
    #[error("transaction {hash} not confirmed within {waited_ms}ms")]
    Timeout { hash: String, waited_ms: u64 },
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
