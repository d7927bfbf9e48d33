//! Configuration for opening a database.
//!
//! Supports:
//! - Programmatic construction with sensible defaults
//! - CLI flags via clap (flattened into `quarryctl`)
//! - Environment variable overrides

use clap::{ArgAction, Args};

/// Options controlling how a database executes statements.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Execute statements on a dedicated worker thread
    #[arg(long, env = "QUARRY_SEPARATE_THREAD", default_value_t = false, action = ArgAction::Set)]
    pub separate_thread: bool,

    /// Block writers until their statement has run (worker thread mode only)
    #[arg(long, env = "QUARRY_AWAIT_COMPLETION", default_value_t = true, action = ArgAction::Set)]
    pub await_completion: bool,

    /// Enforce declared foreign keys (PRAGMA foreign_keys)
    #[arg(long, env = "QUARRY_FOREIGN_KEYS", default_value_t = true, action = ArgAction::Set)]
    pub foreign_keys: bool,

    /// How long SQLite retries a locked database before failing
    #[arg(long, env = "QUARRY_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,
}

impl DatabaseOptions {
    /// Options for running statements on a dedicated worker thread.
    pub fn queued() -> Self {
        Self {
            separate_thread: true,
            ..Self::default()
        }
    }

    /// Worker thread mode where writes return without waiting.
    pub fn detached() -> Self {
        Self {
            separate_thread: true,
            await_completion: false,
            ..Self::default()
        }
    }
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            separate_thread: false,
            await_completion: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        options: DatabaseOptions,
    }

    #[test]
    fn test_default_options() {
        let options = DatabaseOptions::default();
        assert!(!options.separate_thread);
        assert!(options.await_completion);
        assert!(options.foreign_keys);
    }

    #[test]
    fn test_cli_defaults_match_default_impl() {
        let parsed = Harness::parse_from(["quarry"]);
        assert_eq!(parsed.options, DatabaseOptions::default());
    }

    #[test]
    fn test_cli_flags() {
        let parsed = Harness::parse_from([
            "quarry",
            "--separate-thread",
            "true",
            "--await-completion",
            "false",
        ]);
        assert_eq!(parsed.options, DatabaseOptions::detached());
    }
}
