use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::{
    error::{AppError, AppResult},
    generation::PollPolicy,
};

/// Booth timing and output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoothConfig {
    /// How long the printed photo stays in the printing phase (default: 3 s).
    pub print_delay: Duration,
    /// Video job polling cadence and bound.
    pub poll: PollPolicy,
    /// Where flattened exports are written (default: current directory).
    pub output_dir: PathBuf,
}

impl Default for BoothConfig {
    fn default() -> Self {
        Self {
            print_delay: Duration::from_millis(3000),
            poll: PollPolicy::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl BoothConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `WOOLIFY_PRINT_DELAY_MS`     | `3000`  |
    /// | `WOOLIFY_POLL_INTERVAL_SECS` | `5`     |
    /// | `WOOLIFY_MAX_POLLS`          | `120`   |
    /// | `WOOLIFY_OUTPUT_DIR`         | `.`     |
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let print_delay = match get("WOOLIFY_PRINT_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_number(&raw, "WOOLIFY_PRINT_DELAY_MS")?),
            None => defaults.print_delay,
        };

        let interval = match get("WOOLIFY_POLL_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(parse_number(&raw, "WOOLIFY_POLL_INTERVAL_SECS")?),
            None => defaults.poll.interval,
        };

        let max_polls = match get("WOOLIFY_MAX_POLLS") {
            Some(raw) => parse_number::<u32>(&raw, "WOOLIFY_MAX_POLLS")?,
            None => defaults.poll.max_polls,
        };
        if max_polls == 0 {
            return Err(AppError::validation("WOOLIFY_MAX_POLLS must be at least 1"));
        }

        let output_dir = get("WOOLIFY_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        Ok(Self {
            print_delay,
            poll: PollPolicy {
                interval,
                max_polls,
            },
            output_dir,
        })
    }
}

fn parse_number<T: FromStr>(raw: &str, name: &str) -> AppResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::validation(format!("{name} must be a non-negative integer, got {raw}")))
}
