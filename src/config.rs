use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::classifier::RuleSet;

/// Activity recorder, classifier and analytics HTTP API
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Config {
    /// SQLite database file (default: activity.db in the system temp dir)
    #[arg(long, env = "TIMEWARP_DB")]
    pub db_path: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "TIMEWARP_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Keyword table used by the classifier
    #[arg(long, env = "TIMEWARP_RULE_SET", value_enum, default_value_t = RuleSet::Grouped)]
    pub rule_set: RuleSet,

    /// Emit logs as JSON lines
    #[arg(long, env = "TIMEWARP_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("activity.db"))
    }
}
