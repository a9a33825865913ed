//! Timer settings snapshot.
//!
//! # Responsibility
//! - Describe the host-persisted configuration the core reads per operation.
//! - Decode and validate settings from JSON.
//!
//! # Invariants
//! - Every field has a default, so partial or empty JSON objects decode.
//! - Checkbox symbol entries are exactly one character.
//! - Running and paused symbol sets are disjoint.

use crate::model::document::DocumentId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// What happens to a running marker found without a live schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoStopPolicy {
    /// Always resume, crediting the gap.
    Never,
    /// Resume only timers owned by this process session.
    #[default]
    Quit,
    /// Never resume; the gap is dropped.
    Close,
}

impl AutoStopPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Quit => "quit",
            Self::Close => "close",
        }
    }
}

/// Where a new marker is inserted into its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPlacement {
    /// After checkbox, list or heading syntax.
    #[default]
    Head,
    /// End of line.
    Tail,
}

impl InsertPlacement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Tail => "tail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathFilterMode {
    #[default]
    Off,
    /// Bridge active only under listed paths.
    Allow,
    /// Bridge inactive under listed paths.
    Deny,
}

/// Path allow/deny list gating the checkbox bridge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFilter {
    pub mode: PathFilterMode,
    pub paths: Vec<String>,
}

impl PathFilter {
    /// Returns whether the bridge may act on `document`.
    pub fn permits(&self, document: &DocumentId) -> bool {
        let listed = self
            .paths
            .iter()
            .any(|prefix| path_has_prefix(document.as_str(), prefix));
        match self.mode {
            PathFilterMode::Off => true,
            PathFilterMode::Allow => listed,
            PathFilterMode::Deny => !listed,
        }
    }
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let path = path.trim_matches('/');
    let prefix = prefix.trim().trim_matches('/');
    if prefix.is_empty() {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Immutable configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    pub auto_stop: AutoStopPolicy,
    pub placement: InsertPlacement,
    /// Enables checkbox-driven start/pause.
    pub checkbox_bridge: bool,
    pub running_symbols: Vec<String>,
    pub paused_symbols: Vec<String>,
    pub path_filter: PathFilter,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            auto_stop: AutoStopPolicy::default(),
            placement: InsertPlacement::default(),
            checkbox_bridge: true,
            running_symbols: vec!["/".to_string()],
            paused_symbols: vec!["x".to_string(), "X".to_string(), "-".to_string()],
            path_filter: PathFilter::default(),
        }
    }
}

impl TimerSettings {
    /// Decodes and validates settings from a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self, SettingsError> {
        let settings: Self =
            serde_json::from_str(input).map_err(|err| SettingsError::Json(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(|err| SettingsError::Json(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for symbol in self.running_symbols.iter().chain(&self.paused_symbols) {
            if symbol.chars().count() != 1 {
                return Err(SettingsError::InvalidSymbol(symbol.clone()));
            }
        }
        if let Some(shared) = self
            .running_symbols
            .iter()
            .find(|symbol| self.paused_symbols.contains(symbol))
        {
            return Err(SettingsError::OverlappingSymbol(shared.clone()));
        }
        Ok(())
    }

    pub fn is_running_symbol(&self, symbol: char) -> bool {
        contains_symbol(&self.running_symbols, symbol)
    }

    pub fn is_paused_symbol(&self, symbol: char) -> bool {
        contains_symbol(&self.paused_symbols, symbol)
    }
}

fn contains_symbol(symbols: &[String], symbol: char) -> bool {
    symbols
        .iter()
        .any(|candidate| candidate.chars().eq(std::iter::once(symbol)))
}

/// Settings decode/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    Json(String),
    InvalidSymbol(String),
    OverlappingSymbol(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(message) => write!(f, "invalid settings json: {message}"),
            Self::InvalidSymbol(value) => {
                write!(f, "checkbox symbol must be one character: `{value}`")
            }
            Self::OverlappingSymbol(value) => {
                write!(f, "checkbox symbol `{value}` is both running and paused")
            }
        }
    }
}

impl Error for SettingsError {}
