use anyhow::{anyhow, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SETTINGS_FILE: &str = "interchain_settings.json";

/// Directory name under the platform config dir, shared with the operation log.
pub(crate) const APP_DIR_NAME: &str = "interchain-erc20";

fn default_selected_chain_id() -> u64 {
    crate::config::DEFAULT_CHAIN_ID
}

fn default_hide_spam() -> bool {
    true
}

/// User settings that persist between sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    /// Chain the balances page opens on
    #[serde(default = "default_selected_chain_id")]
    pub selected_chain_id: u64,
    /// Custom RPC overrides per chain ID
    #[serde(default)]
    pub custom_rpcs: HashMap<u64, String>,
    /// Distribution contract per chain ID, as entered (validated on use)
    #[serde(default)]
    pub distributors: HashMap<u64, String>,
    /// Native amount attached for cross-chain gas, in whole native tokens
    #[serde(default)]
    pub gas_payment: Option<String>,
    /// Hide tokens the balance API flags as possible spam
    #[serde(default = "default_hide_spam")]
    pub hide_spam: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            selected_chain_id: default_selected_chain_id(),
            custom_rpcs: HashMap::new(),
            distributors: HashMap::new(),
            gas_payment: None,
            hide_spam: default_hide_spam(),
        }
    }
}

impl UserSettings {
    /// Get the settings file path
    fn settings_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join(APP_DIR_NAME);
            if !app_dir.exists() {
                let _ = fs::create_dir_all(&app_dir);
            }
            app_dir.join(SETTINGS_FILE)
        } else {
            PathBuf::from(SETTINGS_FILE)
        }
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let path = Self::settings_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(settings) => {
                        tracing::info!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse settings file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read settings file: {}", e);
                }
            }
        }
        tracing::info!("Using default settings");
        Self::default()
    }

    fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Get the settings file path for display
    pub fn settings_path_display() -> String {
        Self::settings_path().display().to_string()
    }

    /// Get custom RPC for a chain, or None if using default
    pub fn get_custom_rpc(&self, chain_id: u64) -> Option<&String> {
        self.custom_rpcs.get(&chain_id).filter(|s| !s.is_empty())
    }

    /// Set custom RPC for a chain (empty string removes the override)
    pub fn set_custom_rpc(&mut self, chain_id: u64, rpc: String) {
        if rpc.trim().is_empty() {
            self.custom_rpcs.remove(&chain_id);
        } else {
            self.custom_rpcs.insert(chain_id, rpc.trim().to_string());
        }
    }

    /// Set the distribution contract for a chain (empty string removes it).
    pub fn set_distributor(&mut self, chain_id: u64, address: &str) -> Result<()> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            self.distributors.remove(&chain_id);
            return Ok(());
        }
        trimmed
            .parse::<Address>()
            .map_err(|_| anyhow!("Invalid distributor address: {}", trimmed))?;
        self.distributors.insert(chain_id, trimmed.to_string());
        Ok(())
    }

    /// Parsed distributor overrides; malformed entries are skipped.
    pub fn distributor_addresses(&self) -> Vec<(u64, Address)> {
        self.distributors
            .iter()
            .filter_map(|(chain_id, raw)| match raw.parse::<Address>() {
                Ok(address) => Some((*chain_id, address)),
                Err(_) => {
                    tracing::warn!("Skipping invalid distributor for chain {}: {}", chain_id, raw);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x254d06f33bDc5b8ee05b2ea472107E300226659A";

    #[test]
    fn test_user_settings_default_values() {
        let settings = UserSettings::default();
        assert_eq!(settings.selected_chain_id, 80001);
        assert!(settings.custom_rpcs.is_empty());
        assert!(settings.distributors.is_empty());
        assert!(settings.gas_payment.is_none());
        assert!(settings.hide_spam);
    }

    #[test]
    fn test_from_json_fills_missing_fields_with_defaults() {
        let settings = UserSettings::from_json(r#"{"selected_chain_id": 43113}"#).unwrap();
        assert_eq!(settings.selected_chain_id, 43113);
        assert!(settings.hide_spam);
        assert!(settings.distributors.is_empty());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(UserSettings::from_json("not json").is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_distributors() {
        let mut settings = UserSettings::default();
        settings.set_distributor(5, ADDR).unwrap();
        let json = serde_json::to_string(&settings).unwrap();
        let restored = UserSettings::from_json(&json).unwrap();
        assert_eq!(restored.distributors.get(&5).map(String::as_str), Some(ADDR));
    }

    // ==================== custom RPC tests ====================

    #[test]
    fn test_set_and_get_custom_rpc() {
        let mut settings = UserSettings::default();
        settings.set_custom_rpc(80001, "https://custom.rpc.com".to_string());
        assert_eq!(settings.get_custom_rpc(80001), Some(&"https://custom.rpc.com".to_string()));
    }

    #[test]
    fn test_set_custom_rpc_whitespace_removes() {
        let mut settings = UserSettings::default();
        settings.set_custom_rpc(80001, "https://custom.rpc.com".to_string());
        settings.set_custom_rpc(80001, "   ".to_string());
        assert!(settings.get_custom_rpc(80001).is_none());
    }

    #[test]
    fn test_set_custom_rpc_trims_whitespace() {
        let mut settings = UserSettings::default();
        settings.set_custom_rpc(5, "  https://goerli.example  ".to_string());
        assert_eq!(settings.get_custom_rpc(5), Some(&"https://goerli.example".to_string()));
    }

    // ==================== distributor tests ====================

    #[test]
    fn test_set_distributor_rejects_invalid_address() {
        let mut settings = UserSettings::default();
        assert!(settings.set_distributor(5, "0x1234").is_err());
        assert!(settings.distributors.is_empty());
    }

    #[test]
    fn test_set_distributor_empty_removes() {
        let mut settings = UserSettings::default();
        settings.set_distributor(5, ADDR).unwrap();
        settings.set_distributor(5, "").unwrap();
        assert!(settings.distributors.is_empty());
    }

    #[test]
    fn test_distributor_addresses_skips_malformed() {
        let mut settings = UserSettings::default();
        settings.set_distributor(5, ADDR).unwrap();
        settings.distributors.insert(43113, "garbage".to_string());
        let parsed = settings.distributor_addresses();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].0, 5);
        assert_eq!(parsed[0].1, ADDR.parse::<Address>().unwrap());
    }
}
