// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::relay::RelayConfig;
use crate::sql_guard::SqlPolicy;
use crate::utils::get_setting;
use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::time::Duration;

pub const KEY_API_BASE: &str = "ai.api_base";
pub const KEY_MODEL: &str = "ai.model";
pub const KEY_MAX_ROUND_TRIPS: &str = "ai.max_round_trips";
pub const KEY_TIMEOUT_SECS: &str = "ai.timeout_secs";
pub const KEY_SQL_POLICY: &str = "ai.sql_policy";

pub const KNOWN_KEYS: &[&str] = &[
    KEY_API_BASE,
    KEY_MODEL,
    KEY_MAX_ROUND_TRIPS,
    KEY_TIMEOUT_SECS,
    KEY_SQL_POLICY,
];

pub const ENV_API_KEY: &str = "DAFTAR_API_KEY";
pub const ENV_API_BASE: &str = "DAFTAR_API_BASE";
pub const ENV_MODEL: &str = "DAFTAR_MODEL";

#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub api_base: String,
    pub model: String,
    pub max_round_trips: usize,
    pub timeout_secs: u64,
    pub sql_policy: SqlPolicy,
    pub api_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_round_trips: 8,
            timeout_secs: 120,
            sql_policy: SqlPolicy::Strict,
            api_key: None,
        }
    }
}

pub fn parse_policy(s: &str) -> Result<SqlPolicy> {
    match s.trim().to_lowercase().as_str() {
        "strict" => Ok(SqlPolicy::Strict),
        "prefix" => Ok(SqlPolicy::Prefix),
        other => bail!("Unknown SQL policy '{}' (use strict|prefix)", other),
    }
}

/// Check a value before it is stored under `key`.
pub fn validate_setting(key: &str, value: &str) -> Result<()> {
    match key {
        KEY_MAX_ROUND_TRIPS => {
            let n: usize = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid round-trip count '{}'", value))?;
            if n == 0 {
                bail!("{} must be at least 1", key);
            }
        }
        KEY_TIMEOUT_SECS => {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid timeout '{}'", value))?;
            if secs == 0 {
                bail!("{} must be at least 1", key);
            }
        }
        KEY_SQL_POLICY => {
            parse_policy(value)?;
        }
        KEY_API_BASE | KEY_MODEL => {
            if value.trim().is_empty() {
                bail!("{} must not be empty", key);
            }
        }
        _ => bail!("Unknown setting '{}' (known: {})", key, KNOWN_KEYS.join(", ")),
    }
    Ok(())
}

impl AiConfig {
    pub fn load(conn: &Connection) -> Result<Self> {
        Self::load_with_env(conn, |k| std::env::var(k).ok())
    }

    /// Defaults, then the settings table, then environment overrides.
    pub fn load_with_env(conn: &Connection, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = AiConfig::default();
        if let Some(v) = get_setting(conn, KEY_API_BASE)? {
            cfg.api_base = v;
        }
        if let Some(v) = get_setting(conn, KEY_MODEL)? {
            cfg.model = v;
        }
        // values written behind `config set` get the same checks
        if let Some(v) = get_setting(conn, KEY_MAX_ROUND_TRIPS)? {
            validate_setting(KEY_MAX_ROUND_TRIPS, &v)?;
            cfg.max_round_trips = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} '{}'", KEY_MAX_ROUND_TRIPS, v))?;
        }
        if let Some(v) = get_setting(conn, KEY_TIMEOUT_SECS)? {
            validate_setting(KEY_TIMEOUT_SECS, &v)?;
            cfg.timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} '{}'", KEY_TIMEOUT_SECS, v))?;
        }
        if let Some(v) = get_setting(conn, KEY_SQL_POLICY)? {
            cfg.sql_policy = parse_policy(&v)?;
        }
        let non_empty = |k: &str| env(k).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty(ENV_API_BASE) {
            cfg.api_base = v;
        }
        if let Some(v) = non_empty(ENV_MODEL) {
            cfg.model = v;
        }
        cfg.api_key = non_empty(ENV_API_KEY);
        Ok(cfg)
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            model: self.model.clone(),
            max_round_trips: self.max_round_trips,
            timeout: Duration::from_secs(self.timeout_secs),
            policy: self.sql_policy,
        }
    }

    /// Key/value listing with the API key redacted.
    pub fn describe(&self) -> Vec<Vec<String>> {
        vec![
            vec![KEY_API_BASE.into(), self.api_base.clone()],
            vec![KEY_MODEL.into(), self.model.clone()],
            vec![KEY_MAX_ROUND_TRIPS.into(), self.max_round_trips.to_string()],
            vec![KEY_TIMEOUT_SECS.into(), self.timeout_secs.to_string()],
            vec![
                KEY_SQL_POLICY.into(),
                match self.sql_policy {
                    SqlPolicy::Strict => "strict".into(),
                    SqlPolicy::Prefix => "prefix".into(),
                },
            ],
            vec![
                ENV_API_KEY.into(),
                if self.api_key.is_some() {
                    "***REDACTED***".into()
                } else {
                    "(unset)".into()
                },
            ],
        ]
    }
}
