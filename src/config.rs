//! Application-level configuration loading: phase timings, lobby limits and stream tuning.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::state::{lobby::MIN_READY_PLAYERS, state_machine::PhaseDurations};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "STUDY_QUIZ_CONFIG_PATH";

const DEFAULT_MAX_PARTICIPANTS: u32 = 10;
/// Hard ceiling on the participant limit a host may request.
pub const MAX_PARTICIPANTS_LIMIT: u32 = 100;
const DEFAULT_EVENT_CAPACITY: usize = 64;
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);
const DEFAULT_PRESENCE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_GAME_RETENTION: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Countdown lengths used by every game.
    pub phase_durations: PhaseDurations,
    /// Participant cap applied when a host does not choose one.
    pub default_max_participants: u32,
    /// Events buffered per session stream before slow readers lag.
    pub event_capacity: usize,
    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,
    /// Time a presence socket has to send its `track` frame.
    pub presence_timeout: Duration,
    /// How long a finished game stays in memory before views fall back to stored scores.
    pub finished_game_retention: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        durations = ?app_config.phase_durations,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; omitted keys keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            phase_durations: PhaseDurations::default(),
            default_max_participants: DEFAULT_MAX_PARTICIPANTS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            keep_alive: DEFAULT_KEEP_ALIVE,
            presence_timeout: DEFAULT_PRESENCE_TIMEOUT,
            finished_game_retention: DEFAULT_GAME_RETENTION,
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    phases: RawPhases,
    default_max_participants: Option<u32>,
    event_capacity: Option<usize>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    keep_alive_secs: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    presence_timeout_secs: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    finished_game_retention_secs: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// Per-phase countdowns in seconds.
struct RawPhases {
    get_ready: Option<u32>,
    question: Option<u32>,
    answer_reveal: Option<u32>,
    leaderboard: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let phase = |raw: Option<u32>, fallback: u32| raw.unwrap_or(fallback).max(1);
        let durations = defaults.phase_durations;

        Self {
            phase_durations: PhaseDurations {
                get_ready: phase(value.phases.get_ready, durations.get_ready),
                question: phase(value.phases.question, durations.question),
                answer_reveal: phase(value.phases.answer_reveal, durations.answer_reveal),
                leaderboard: phase(value.phases.leaderboard, durations.leaderboard),
            },
            default_max_participants: value
                .default_max_participants
                .unwrap_or(defaults.default_max_participants)
                .clamp(MIN_READY_PLAYERS as u32, MAX_PARTICIPANTS_LIMIT),
            event_capacity: value
                .event_capacity
                .unwrap_or(defaults.event_capacity)
                .max(1),
            keep_alive: value.keep_alive_secs.unwrap_or(defaults.keep_alive),
            presence_timeout: value
                .presence_timeout_secs
                .unwrap_or(defaults.presence_timeout),
            finished_game_retention: value
                .finished_game_retention_secs
                .unwrap_or(defaults.finished_game_retention),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(AppConfig::from_json("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_given_keys() {
        let config = AppConfig::from_json(
            r#"{ "phases": { "question": 20 }, "keep_alive_secs": 30, "finished_game_retention_secs": 60 }"#,
        )
        .unwrap();
        assert_eq!(config.phase_durations.question, 20);
        assert_eq!(config.phase_durations.get_ready, 5);
        assert_eq!(config.keep_alive, Duration::from_secs(30));
        assert_eq!(config.finished_game_retention, Duration::from_secs(60));
        assert_eq!(config.default_max_participants, DEFAULT_MAX_PARTICIPANTS);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = AppConfig::from_json(
            r#"{ "phases": { "leaderboard": 0 }, "default_max_participants": 1000, "event_capacity": 0 }"#,
        )
        .unwrap();
        assert_eq!(config.phase_durations.leaderboard, 1);
        assert_eq!(config.default_max_participants, MAX_PARTICIPANTS_LIMIT);
        assert_eq!(config.event_capacity, 1);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json(r#"{ "phases": 3 }"#).is_err());
    }
}
