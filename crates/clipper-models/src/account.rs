//! Per-account identity and settings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plan::DEFAULT_PART_PREFIX;

/// Default base interval between two publishes, in minutes.
pub const DEFAULT_INTERVAL_MINUTES: f64 = 20.0;
/// Default randomization spread around the base interval, in minutes.
pub const DEFAULT_SPREAD_MINUTES: f64 = 2.0;
/// Default x264 constant rate factor.
pub const DEFAULT_CRF: u8 = 18;
/// Default x264 preset.
pub const DEFAULT_X264_PRESET: &str = "medium";

/// Identifier of one managed account (one tab in the control surface).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-account settings.
///
/// Mutated only through the supervisor; the queue worker takes a snapshot
/// per job, so mid-job edits apply to the next job pulled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// OAuth access token used by the publish collaborator.
    #[serde(default)]
    pub access_token: String,
    /// Base interval between two publishes, in minutes.
    #[serde(default = "default_interval")]
    pub publish_interval_minutes: f64,
    /// Whether to randomize the interval around the base.
    #[serde(default)]
    pub randomize_interval: bool,
    /// Uniform spread around the base interval, in minutes.
    #[serde(default = "default_spread")]
    pub randomization_spread_minutes: f64,
    /// Whether to transcribe the source and burn subtitles into clips.
    #[serde(default)]
    pub subtitles_enabled: bool,
    /// Title overlay drawn on every clip (empty disables it).
    #[serde(default)]
    pub title: String,
    /// Prefix for the per-clip part label ("Parte 1", "Parte 2", ...).
    #[serde(default = "default_part_prefix")]
    pub part_label_prefix: String,
    /// Whether the part label overlay is drawn.
    #[serde(default = "default_true")]
    pub part_label_enabled: bool,
    /// x264 constant rate factor for rendered clips.
    #[serde(default = "default_crf")]
    pub crf: u8,
    /// x264 preset for rendered clips.
    #[serde(default = "default_preset")]
    pub x264_preset: String,
}

fn default_interval() -> f64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_spread() -> f64 {
    DEFAULT_SPREAD_MINUTES
}

fn default_part_prefix() -> String {
    DEFAULT_PART_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

fn default_crf() -> u8 {
    DEFAULT_CRF
}

fn default_preset() -> String {
    DEFAULT_X264_PRESET.to_string()
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            publish_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            randomize_interval: false,
            randomization_spread_minutes: DEFAULT_SPREAD_MINUTES,
            subtitles_enabled: false,
            title: String::new(),
            part_label_prefix: default_part_prefix(),
            part_label_enabled: true,
            crf: DEFAULT_CRF,
            x264_preset: default_preset(),
        }
    }
}
