use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use client_core::{GatewayOptions, ListModule};
use serde::Deserialize;
use shared::domain::AccountAddress;
use url::Url;

pub const SETTINGS_FILE: &str = "todo.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub node_url: String,
    pub wallet_url: String,
    pub module_address: Option<String>,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_url: "https://fullnode.devnet.aptoslabs.com/v1".into(),
            wallet_url: "http://127.0.0.1:8787".into(),
            module_address: None,
            confirmation_timeout_secs: 20,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    node_url: Option<String>,
    wallet_url: Option<String>,
    module_address: Option<String>,
    confirmation_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
}

impl Settings {
    pub fn list_module(&self) -> anyhow::Result<ListModule> {
        let raw = self.module_address.as_deref().ok_or_else(|| {
            anyhow!("module address is not configured; set module_address in {SETTINGS_FILE} or TODO_MODULE_ADDRESS")
        })?;
        let address = AccountAddress::parse(raw)
            .with_context(|| format!("invalid module address '{raw}'"))?;
        Ok(ListModule::new(address))
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }

    /// Fails when either endpoint is not an absolute http(s) URL.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, raw) in [("node_url", &self.node_url), ("wallet_url", &self.wallet_url)] {
            let url = Url::parse(raw).with_context(|| format!("invalid {name} '{raw}'"))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(anyhow!("{name} must use http or https, got '{raw}'"));
            }
        }
        Ok(())
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if Path::new(SETTINGS_FILE).exists() {
        let raw = fs::read_to_string(SETTINGS_FILE)
            .with_context(|| format!("failed to read {SETTINGS_FILE}"))?;
        apply_file(&mut settings, &raw)?;
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings =
        toml::from_str(raw).with_context(|| format!("failed to parse {SETTINGS_FILE}"))?;

    if let Some(v) = file_cfg.node_url {
        settings.node_url = v;
    }
    if let Some(v) = file_cfg.wallet_url {
        settings.wallet_url = v;
    }
    if let Some(v) = file_cfg.module_address {
        settings.module_address = Some(v);
    }
    if let Some(v) = file_cfg.confirmation_timeout_secs {
        settings.confirmation_timeout_secs = v;
    }
    if let Some(v) = file_cfg.poll_interval_ms {
        settings.poll_interval_ms = v;
    }
    Ok(())
}

/// Later keys win: `APP__*` overrides the shorter `TODO_*` form.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["TODO_NODE_URL", "APP__NODE_URL"] {
        if let Some(v) = lookup(key) {
            settings.node_url = v;
        }
    }
    for key in ["TODO_WALLET_URL", "APP__WALLET_URL"] {
        if let Some(v) = lookup(key) {
            settings.wallet_url = v;
        }
    }
    for key in ["TODO_MODULE_ADDRESS", "APP__MODULE_ADDRESS"] {
        if let Some(v) = lookup(key) {
            settings.module_address = Some(v);
        }
    }

    if let Some(parsed) = lookup("APP__CONFIRMATION_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.confirmation_timeout_secs = parsed;
    }
    if let Some(parsed) = lookup("APP__POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
        settings.poll_interval_ms = parsed;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
