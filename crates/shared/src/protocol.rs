use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{LedgerVersion, TaskId};

pub const ENTRY_FUNCTION_PAYLOAD: &str = "entry_function_payload";
pub const TABLE_KEY_TYPE: &str = "u64";

/// Serde adapter for u64 values the ledger encodes as decimal strings.
/// Bare JSON integers are accepted on input as well.
pub mod string_u64 {
    use std::fmt;

    use serde::{de, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        struct U64Visitor;

        impl<'de> de::Visitor<'de> for U64Visitor {
            type Value = u64;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a u64 as a decimal string or integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
                Ok(v)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
                u64::try_from(v).map_err(|_| E::custom(format!("negative value {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
                v.parse::<u64>()
                    .map_err(|e| E::custom(format!("invalid u64 {v:?}: {e}")))
            }
        }

        deserializer.deserialize_any(U64Visitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryFunctionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl EntryFunctionPayload {
    pub fn new(function: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            kind: ENTRY_FUNCTION_PAYLOAD.to_string(),
            function: function.into(),
            type_arguments: Vec::new(),
            arguments,
        }
    }
}

/// Generic account resource envelope; `data` is decoded by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableItemRequest {
    pub key_type: String,
    pub value_type: String,
    pub key: String,
}

impl TableItemRequest {
    pub fn task(value_type: impl Into<String>, key: TaskId) -> Self {
        Self {
            key_type: TABLE_KEY_TYPE.to_string(),
            value_type: value_type.into(),
            key: key.to_string(),
        }
    }
}

/// Handle returned once a signed transaction is accepted into the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: String,
}

/// Transaction as reported by `transactions/by_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub hash: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub vm_status: Option<String>,
    #[serde(default)]
    pub version: Option<LedgerVersion>,
}

impl TransactionRecord {
    pub fn is_pending(&self) -> bool {
        self.kind == "pending_transaction"
    }
}

/// Outcome of a transaction that the ledger committed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub hash: String,
    pub version: Option<LedgerVersion>,
    pub vm_status: String,
}
