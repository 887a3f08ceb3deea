use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use evo_masternode::RegistryParams;
use evo_spork::{spork_by_name, SporkConfig, SporkDef, DEFAULT_MAX_FUTURE_DRIFT_SECS};
use evo_types::PublicKey;

/// Settings persisted with confy. Command-line flags override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub data_dir: Option<PathBuf>,
    /// Hex-encoded spork signer public keys.
    pub spork_addresses: Vec<String>,
    /// Defaults to a simple majority of `spork_addresses`.
    pub min_spork_keys: Option<usize>,
    pub dip3_activation_height: u32,
    pub dip3_enforcement_height: u32,
    pub max_reorg_depth: usize,
    pub spork_tick_secs: u64,
    pub spork_max_future_drift_secs: u64,
    pub spork_signature_ttl_secs: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let params = RegistryParams::default();
        Self {
            data_dir: None,
            spork_addresses: Vec::new(),
            min_spork_keys: None,
            dip3_activation_height: params.activation_height,
            dip3_enforcement_height: params.activation_height,
            max_reorg_depth: params.max_reorg_depth,
            spork_tick_secs: 60,
            spork_max_future_drift_secs: DEFAULT_MAX_FUTURE_DRIFT_SECS,
            spork_signature_ttl_secs: None,
        }
    }
}

/// Per-run settings from the command line.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub spork_addresses: Vec<String>,
    pub min_spork_keys: Option<usize>,
    pub dip3_heights: Option<(u32, u32)>,
    pub data_dir: Option<PathBuf>,
}

impl NodeConfig {
    /// The configuration for this run. `self` is left as loaded, so it can be
    /// stored back without the overrides.
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> NodeConfig {
        let mut cfg = self.clone();
        if !overrides.spork_addresses.is_empty() {
            cfg.spork_addresses = overrides.spork_addresses.clone();
        }
        if overrides.min_spork_keys.is_some() {
            cfg.min_spork_keys = overrides.min_spork_keys;
        }
        if let Some((activation, enforcement)) = overrides.dip3_heights {
            cfg.dip3_activation_height = activation;
            cfg.dip3_enforcement_height = enforcement;
        }
        if overrides.data_dir.is_some() {
            cfg.data_dir = overrides.data_dir.clone();
        }
        cfg
    }

    pub fn registry_params(&self) -> RegistryParams {
        RegistryParams {
            activation_height: self.dip3_activation_height,
            max_reorg_depth: self.max_reorg_depth,
            ..RegistryParams::default()
        }
    }

    pub fn spork_config(&self, signing_key: Option<&str>) -> Result<SporkConfig> {
        let keys = self
            .spork_addresses
            .iter()
            .map(|address| parse_public_key(address))
            .collect::<Result<Vec<_>>>()?;
        let min_signers = self.min_spork_keys.unwrap_or(keys.len() / 2 + usize::from(!keys.is_empty()));

        let mut config = SporkConfig::new(keys, min_signers);
        config.max_future_drift_secs = self.spork_max_future_drift_secs;
        config.signature_ttl_secs = self.spork_signature_ttl_secs;
        if let Some(secret) = signing_key {
            config = config.with_signing_key(parse_secret_key(secret)?);
        }
        Ok(config)
    }

    pub fn spork_tick_interval(&self) -> Duration {
        Duration::from_secs(self.spork_tick_secs.max(1))
    }
}

/// Parses `-dip3params` style `activation:enforcement` heights.
pub fn parse_dip3_params(value: &str) -> Result<(u32, u32)> {
    let (activation, enforcement) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("expected <activation>:<enforcement>, got {:?}", value))?;
    let activation: u32 = activation.trim().parse().context("invalid DIP3 activation height")?;
    let enforcement: u32 = enforcement.trim().parse().context("invalid DIP3 enforcement height")?;
    if enforcement < activation {
        bail!("DIP3 enforcement height {} is below activation height {}", enforcement, activation);
    }
    Ok((activation, enforcement))
}

pub fn parse_public_key(value: &str) -> Result<PublicKey> {
    let bytes = hex::decode(value.trim()).with_context(|| format!("invalid spork key {:?}", value))?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("spork key must be 32 bytes, got {}", bytes.len()))
}

fn parse_secret_key(value: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(value.trim()).context("invalid spork signing key")?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("spork signing key must be 32 bytes, got {}", bytes.len()))
}

/// Parses `NAME=VALUE` as given to `--spork`.
pub fn parse_spork_assignment(value: &str) -> Result<(&'static SporkDef, i64)> {
    let (name, spork_value) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got {:?}", value))?;
    let def = spork_by_name(name.trim()).ok_or_else(|| anyhow!("unknown spork {}", name))?;
    let spork_value = spork_value.trim().parse().context("spork value must be an integer")?;
    Ok((def, spork_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_crypto::EvoKeyPair;
    use evo_spork::SPORK_4_DIP0003_ENFORCED;

    #[test]
    fn test_parse_dip3_params() {
        assert_eq!(parse_dip3_params("135:150").unwrap(), (135, 150));
        assert!(parse_dip3_params("135").is_err());
        assert!(parse_dip3_params("150:135").is_err());
        assert!(parse_dip3_params("a:1").is_err());
    }

    #[test]
    fn test_parse_spork_assignment() {
        let (def, value) = parse_spork_assignment("SPORK_4_DIP0003_ENFORCED=16").unwrap();
        assert_eq!(def.id, SPORK_4_DIP0003_ENFORCED);
        assert_eq!(value, 16);
        assert!(parse_spork_assignment("SPORK_4_DIP0003_ENFORCED").is_err());
        assert!(parse_spork_assignment("SPORK_99=1").is_err());
    }

    #[test]
    fn test_overrides_do_not_touch_stored_config() {
        let stored = NodeConfig { spork_addresses: vec!["aa".repeat(32)], ..NodeConfig::default() };
        let overrides = ConfigOverrides {
            spork_addresses: vec!["bb".repeat(32), "cc".repeat(32)],
            min_spork_keys: Some(2),
            dip3_heights: Some((135, 150)),
            data_dir: None,
        };
        let run = stored.with_overrides(&overrides);
        assert_eq!(run.spork_addresses.len(), 2);
        assert_eq!(run.min_spork_keys, Some(2));
        assert_eq!((run.dip3_activation_height, run.dip3_enforcement_height), (135, 150));

        assert_eq!(stored.spork_addresses, vec!["aa".repeat(32)]);
        assert_eq!(stored.min_spork_keys, None);
        let unchanged = stored.with_overrides(&ConfigOverrides::default());
        assert_eq!(unchanged.spork_addresses, stored.spork_addresses);
        assert_eq!(unchanged.dip3_activation_height, stored.dip3_activation_height);
    }

    #[test]
    fn test_spork_config_defaults_to_majority() {
        let keys: Vec<String> = (1..=5u8)
            .map(|i| hex::encode(EvoKeyPair::from_secret_bytes(&[i; 32]).public_key()))
            .collect();
        let cfg = NodeConfig { spork_addresses: keys, ..NodeConfig::default() };
        let spork_config = cfg.spork_config(Some(&hex::encode([2u8; 32]))).unwrap();
        assert_eq!(spork_config.min_signers, 3);
        assert!(spork_config.validate().unwrap().is_some());

        let bad = NodeConfig { spork_addresses: vec!["abcd".to_string()], ..NodeConfig::default() };
        assert!(bad.spork_config(None).is_err());
        assert_eq!(NodeConfig::default().spork_config(None).unwrap().min_signers, 0);
    }
}
