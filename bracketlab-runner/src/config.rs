//! Serializable replay session configuration.
//!
//! A session is one TOML file: engine settings, batch parallelism, and the
//! day's orders — either fully specified brackets or raw scanner setups that
//! get sized here. The whole file hashes to a [`ReplayId`] so identical
//! sessions are recognizably identical in filenames and reports.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bracketlab_core::domain::{ConditionalOrder, Direction, OrderError};
use bracketlab_core::engine::EngineConfig;
use bracketlab_core::sizing::{self, BracketRatio, RatioParseError, SetupCandle};

/// Unique identifier for a replay session (content-addressable hash).
pub type ReplayId = String;

/// Errors from loading or expanding a session config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("bad bracket ratio: {0}")]
    Ratio(#[from] RatioParseError),

    #[error("order for '{symbol}' is invalid: {source}")]
    Order { symbol: String, source: OrderError },

    #[error("session has no orders and no setups")]
    Empty,
}

/// A raw scanner setup, sized into an order via the session risk budget.
///
/// `high`/`low` describe the setup candle; the bracket levels come from the
/// candle and the target:stop ratio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetupSpec {
    pub symbol: String,
    pub direction: Direction,
    pub high: f64,
    pub low: f64,
    /// `"target:stop"` override; the session ratio applies when absent.
    #[serde(default)]
    pub ratio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Serializable configuration for one replay session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayConfig {
    /// Engine settings shared by every replay in the session.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Worker threads for the batch; absent = one per core, 1 = sequential.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Capital at risk per bracket when sizing setups.
    #[serde(default = "default_risk_amount")]
    pub risk_amount: f64,

    /// Session-wide `"target:stop"` ratio for setups without their own.
    #[serde(default = "default_ratio")]
    pub ratio: String,

    /// Fully specified orders, replayed as-is.
    #[serde(default)]
    pub orders: Vec<ConditionalOrder>,

    /// Scanner setups, sized into orders on expansion.
    #[serde(default)]
    pub setups: Vec<SetupSpec>,
}

fn default_risk_amount() -> f64 {
    200.0
}

fn default_ratio() -> String {
    "2:1".to_string()
}

impl ReplayConfig {
    /// Load a session from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a session from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Computes a deterministic hash ID for this session.
    ///
    /// Two sessions with identical configs hash identically, so reports and
    /// cached artifacts can be keyed by content rather than wall clock.
    pub fn replay_id(&self) -> ReplayId {
        let json = serde_json::to_string(self).expect("ReplayConfig serialization failed");
        let hash = blake3::hash(json.as_bytes());
        format!("{}", hash.to_hex())
    }

    /// Expand the session into per-order results: explicit orders first,
    /// then setups sized at the session risk budget. Each entry is either a
    /// validated order or the problem that stops it, so a checker can report
    /// every issue in one pass instead of dying on the first.
    pub fn expanded_orders(&self) -> Vec<Result<ConditionalOrder, ConfigError>> {
        let session_ratio: Result<BracketRatio, RatioParseError> = self.ratio.parse();

        let mut results = Vec::with_capacity(self.orders.len() + self.setups.len());
        for order in &self.orders {
            results.push(validated(order.clone()));
        }
        for setup in &self.setups {
            let sized = self
                .size_setup(setup, &session_ratio)
                .map_err(ConfigError::from);
            results.push(sized.and_then(validated));
        }
        results
    }

    /// Expand the full order list, failing on the first problem.
    pub fn all_orders(&self) -> Result<Vec<ConditionalOrder>, ConfigError> {
        if self.orders.is_empty() && self.setups.is_empty() {
            return Err(ConfigError::Empty);
        }
        self.expanded_orders().into_iter().collect()
    }

    /// Expand the session for a replay run: every entry that can produce an
    /// order does, without a validity gate — the engine closes a bad bracket
    /// as rejected on its own run, so one mistake never stops the batch.
    /// Only entries that cannot be built at all (a setup whose ratio does
    /// not parse) come back in the skip list, paired with their symbol.
    pub fn replay_orders(&self) -> (Vec<ConditionalOrder>, Vec<(String, ConfigError)>) {
        let session_ratio: Result<BracketRatio, RatioParseError> = self.ratio.parse();

        let mut orders = self.orders.clone();
        orders.reserve(self.setups.len());
        let mut skipped = Vec::new();
        for setup in &self.setups {
            match self.size_setup(setup, &session_ratio) {
                Ok(order) => orders.push(order),
                Err(err) => skipped.push((setup.symbol.clone(), ConfigError::Ratio(err))),
            }
        }
        (orders, skipped)
    }

    fn size_setup(
        &self,
        setup: &SetupSpec,
        session_ratio: &Result<BracketRatio, RatioParseError>,
    ) -> Result<ConditionalOrder, RatioParseError> {
        let ratio = match &setup.ratio {
            Some(raw) => raw.parse(),
            None => session_ratio.clone(),
        }?;
        Ok(sizing::build_order(
            &setup.symbol,
            setup.direction,
            SetupCandle {
                high: setup.high,
                low: setup.low,
            },
            ratio,
            self.risk_amount,
            setup.created_at,
        ))
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            jobs: None,
            risk_amount: default_risk_amount(),
            ratio: default_ratio(),
            orders: Vec::new(),
            setups: Vec::new(),
        }
    }
}

fn validated(order: ConditionalOrder) -> Result<ConditionalOrder, ConfigError> {
    match order.validate() {
        Ok(()) => Ok(order),
        Err(source) => Err(ConfigError::Order {
            symbol: order.symbol.clone(),
            source,
        }),
    }
}
