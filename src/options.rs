//! Client configuration.
//!
//! `Options` is a closed set of recognized settings. Changes go through
//! `OptionsUpdate`, a partial patch: keys it leaves unset keep their current
//! value. Unknown keys are rejected by name.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::level_filters::LevelFilter;
use tracing::Level;

use crate::error::SorterError;

/// Maximum characters of a request/response body written to the log unless
/// `debug_http_full` is set.
pub const MAX_LOGGED_BODY_CHARS: usize = 1_000;

/// External scale callers express vote magnitudes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteMagnitude {
    /// Signed, symmetric around zero: `-50..=50`.
    #[default]
    Equal,
    /// Unsigned, centred on the midpoint: `0..=100`.
    Positive,
}

impl VoteMagnitude {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteMagnitude::Equal => "equal",
            VoteMagnitude::Positive => "positive",
        }
    }
}

impl fmt::Display for VoteMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteMagnitude {
    type Err = SorterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" => Ok(VoteMagnitude::Equal),
            "positive" => Ok(VoteMagnitude::Positive),
            other => Err(SorterError::invalid_option(
                "vote_magnitude",
                format!("expected \"equal\" or \"positive\", got {other:?}"),
            )),
        }
    }
}

/// Active client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Options {
    pub vote_magnitude: VoteMagnitude,
    pub verbose: bool,
    /// Takes precedence over `verbose` when both are set.
    pub quiet: bool,
    pub compatibility_warnings: bool,
    pub debug_http_full: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            vote_magnitude: VoteMagnitude::Equal,
            verbose: false,
            quiet: false,
            compatibility_warnings: true,
            debug_http_full: false,
        }
    }
}

impl Options {
    /// Names of every recognized option.
    pub const KEYS: [&'static str; 5] = [
        "vote_magnitude",
        "verbose",
        "quiet",
        "compatibility_warnings",
        "debug_http_full",
    ];

    /// Apply a patch, producing the new active configuration.
    pub fn merged(&self, update: &OptionsUpdate) -> Options {
        Options {
            vote_magnitude: update.vote_magnitude.unwrap_or(self.vote_magnitude),
            verbose: update.verbose.unwrap_or(self.verbose),
            quiet: update.quiet.unwrap_or(self.quiet),
            compatibility_warnings: update
                .compatibility_warnings
                .unwrap_or(self.compatibility_warnings),
            debug_http_full: update.debug_http_full.unwrap_or(self.debug_http_full),
        }
    }

    /// Effective log level.
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::WARN
        } else if self.verbose {
            LevelFilter::TRACE
        } else {
            LevelFilter::INFO
        }
    }

    /// Whether an event at `level` should be emitted under this configuration.
    pub fn allows(&self, level: Level) -> bool {
        level <= self.log_level()
    }

    /// Body text as it should appear in the log.
    pub fn loggable_body<'a>(&self, body: &'a str) -> Cow<'a, str> {
        if self.debug_http_full {
            return Cow::Borrowed(body);
        }
        match body.char_indices().nth(MAX_LOGGED_BODY_CHARS) {
            Some((cut, _)) => Cow::Owned(format!(
                "{}... [truncated, {} bytes total]",
                &body[..cut],
                body.len()
            )),
            None => Cow::Borrowed(body),
        }
    }
}

/// Partial configuration patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_magnitude: Option<VoteMagnitude>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility_warnings: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_http_full: Option<bool>,
}

impl OptionsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vote_magnitude(mut self, scale: VoteMagnitude) -> Self {
        self.vote_magnitude = Some(scale);
        self
    }

    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = Some(on);
        self
    }

    pub fn quiet(mut self, on: bool) -> Self {
        self.quiet = Some(on);
        self
    }

    pub fn compatibility_warnings(mut self, on: bool) -> Self {
        self.compatibility_warnings = Some(on);
        self
    }

    pub fn debug_http_full(mut self, on: bool) -> Self {
        self.debug_http_full = Some(on);
        self
    }

    /// Parse a JSON object of option keys.
    pub fn from_json(value: &Value) -> Result<Self, SorterError> {
        let map = value.as_object().ok_or_else(|| {
            SorterError::invalid_option("<root>", "options must be a JSON object")
        })?;
        Self::from_map(map)
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self, SorterError> {
        let mut update = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "vote_magnitude" => {
                    let s = value.as_str().ok_or_else(|| {
                        SorterError::invalid_option(key, "expected a string")
                    })?;
                    update.vote_magnitude = Some(s.parse()?);
                }
                "verbose" => update.verbose = Some(json_bool(key, value)?),
                "quiet" => update.quiet = Some(json_bool(key, value)?),
                "compatibility_warnings" => {
                    update.compatibility_warnings = Some(json_bool(key, value)?)
                }
                "debug_http_full" => update.debug_http_full = Some(json_bool(key, value)?),
                _ => return Err(SorterError::unknown_option(key)),
            }
        }
        Ok(update)
    }

    /// Set one option from its textual form (`"true"`, `"positive"`, ...).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SorterError> {
        match key {
            "vote_magnitude" => self.vote_magnitude = Some(value.parse()?),
            "verbose" => self.verbose = Some(text_bool(key, value)?),
            "quiet" => self.quiet = Some(text_bool(key, value)?),
            "compatibility_warnings" => self.compatibility_warnings = Some(text_bool(key, value)?),
            "debug_http_full" => self.debug_http_full = Some(text_bool(key, value)?),
            _ => return Err(SorterError::unknown_option(key)),
        }
        Ok(())
    }

    /// Parse `key=value` assignments.
    pub fn from_assignments<I, S>(pairs: I) -> Result<Self, SorterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut update = Self::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                SorterError::invalid_option(pair, "expected key=value")
            })?;
            update.set(key.trim(), value.trim())?;
        }
        Ok(update)
    }
}

fn json_bool(key: &str, value: &Value) -> Result<bool, SorterError> {
    value
        .as_bool()
        .ok_or_else(|| SorterError::invalid_option(key, format!("expected a boolean, got {value}")))
}

fn text_bool(key: &str, value: &str) -> Result<bool, SorterError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(SorterError::invalid_option(
            key,
            format!("expected a boolean, got {value:?}"),
        )),
    }
}
