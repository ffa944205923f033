use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use crate::market_data::adapters::coingecko::{DEFAULT_API_URL, DEFAULT_ASSET_ID, DEFAULT_TIMEOUT};

pub const DEFAULT_DASHBOARD_PATH: &str = "xrp_consolidated_dashboard.json";
pub const DEFAULT_INTERVAL_MINUTES: u64 = 15;

/// Largest interval whose length in seconds still fits a `u64`.
pub const MAX_INTERVAL_MINUTES: u64 = u64::MAX / 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub dashboard_path: PathBuf,
    pub api_url: String,
    pub asset_id: String,
    pub request_timeout: Duration,
    pub interval_minutes: u64,
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // dotenvy loads .env, but doesn't override already-set env vars
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let log_level = get("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let dashboard_path = get("DASHBOARD_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DASHBOARD_PATH));
        let api_url = get("PRICE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let asset_id = get("PRICE_ASSET_ID").unwrap_or_else(|| DEFAULT_ASSET_ID.to_string());

        let request_timeout = parse_var::<u64>(&get, "PRICE_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let interval_minutes = parse_var::<u64>(&get, "UPDATE_INTERVAL_MINUTES")?
            .unwrap_or(DEFAULT_INTERVAL_MINUTES);
        anyhow::ensure!(
            (1..=MAX_INTERVAL_MINUTES).contains(&interval_minutes),
            "UPDATE_INTERVAL_MINUTES must be between 1 and {MAX_INTERVAL_MINUTES}"
        );

        let metrics_addr = parse_var::<SocketAddr>(&get, "METRICS_ADDR")?;

        Ok(Self {
            log_level,
            dashboard_path,
            api_url,
            asset_id,
            request_timeout,
            interval_minutes,
            metrics_addr,
        })
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: {raw:?}"))
        })
        .transpose()
}

/// Keeps the XRP dashboard JSON current with live market data.
///
/// With no arguments, runs a single update and exits.
#[derive(Debug, Parser)]
#[command(name = "xrp-dashboard-updater", version)]
pub struct Cli {
    /// Keep updating every MINUTES (default 15) until Ctrl+C
    #[arg(
        long,
        value_name = "MINUTES",
        num_args = 0..=1,
        value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINUTES)
    )]
    pub continuous: Option<Option<u64>>,

    /// Dashboard document to update
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

/// What this invocation should do, after CLI flags override the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Single,
    Continuous { interval: Duration },
}

impl Cli {
    pub fn apply(&self, config: &mut Config) -> RunMode {
        if let Some(path) = &self.file {
            config.dashboard_path = path.clone();
        }

        match self.continuous {
            None => RunMode::Single,
            Some(minutes) => {
                let minutes = minutes.unwrap_or(config.interval_minutes);
                config.interval_minutes = minutes;
                RunMode::Continuous { interval: Duration::from_secs(minutes * 60) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.dashboard_path, PathBuf::from("xrp_consolidated_dashboard.json"));
        assert_eq!(config.api_url, "https://api.coingecko.com/api/v3");
        assert_eq!(config.asset_id, "ripple");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.interval_minutes, 15);
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("DASHBOARD_PATH", "/srv/dash/data.json"),
            ("PRICE_TIMEOUT_SECS", "3"),
            ("UPDATE_INTERVAL_MINUTES", " 5 "),
            ("METRICS_ADDR", "127.0.0.1:9100"),
        ])
        .unwrap();
        assert_eq!(config.dashboard_path, PathBuf::from("/srv/dash/data.json"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.interval_minutes, 5);
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = config_from(&[("PRICE_TIMEOUT_SECS", "ten")]).unwrap_err();
        assert!(err.to_string().contains("PRICE_TIMEOUT_SECS"));
        assert!(config_from(&[("UPDATE_INTERVAL_MINUTES", "0")]).is_err());
        assert!(config_from(&[("METRICS_ADDR", "localhost")]).is_err());
    }

    #[test]
    fn no_arguments_is_a_single_update() {
        let cli = Cli::try_parse_from(["xrp-dashboard-updater"]).unwrap();
        let mut config = config_from(&[]).unwrap();
        assert_eq!(cli.apply(&mut config), RunMode::Single);
    }

    #[test]
    fn continuous_without_minutes_uses_configured_interval() {
        let cli = Cli::try_parse_from(["xrp-dashboard-updater", "--continuous"]).unwrap();
        let mut config = config_from(&[("UPDATE_INTERVAL_MINUTES", "20")]).unwrap();
        assert_eq!(
            cli.apply(&mut config),
            RunMode::Continuous { interval: Duration::from_secs(20 * 60) }
        );
    }

    #[test]
    fn continuous_with_minutes() {
        let cli = Cli::try_parse_from(["xrp-dashboard-updater", "--continuous", "5", "-f", "dash.json"])
            .unwrap();
        let mut config = config_from(&[]).unwrap();
        assert_eq!(
            cli.apply(&mut config),
            RunMode::Continuous { interval: Duration::from_secs(300) }
        );
        assert_eq!(config.interval_minutes, 5);
        assert_eq!(config.dashboard_path, PathBuf::from("dash.json"));
    }

    #[test]
    fn rejects_zero_or_non_numeric_interval() {
        assert!(Cli::try_parse_from(["xrp-dashboard-updater", "--continuous", "0"]).is_err());
        assert!(Cli::try_parse_from(["xrp-dashboard-updater", "--continuous", "soon"]).is_err());
    }

    #[test]
    fn interval_upper_bound_is_enforced() {
        let too_long = (MAX_INTERVAL_MINUTES + 1).to_string();
        assert!(Cli::try_parse_from(["xrp-dashboard-updater", "--continuous", too_long.as_str()]).is_err());
        assert!(Cli::try_parse_from(["xrp-dashboard-updater", "--continuous", "18446744073709551615"]).is_err());
        assert!(config_from(&[("UPDATE_INTERVAL_MINUTES", too_long.as_str())]).is_err());

        let longest = MAX_INTERVAL_MINUTES.to_string();
        let cli = Cli::try_parse_from(["xrp-dashboard-updater", "--continuous", longest.as_str()]).unwrap();
        let mut config = config_from(&[]).unwrap();
        assert_eq!(
            cli.apply(&mut config),
            RunMode::Continuous { interval: Duration::from_secs(MAX_INTERVAL_MINUTES * 60) }
        );
    }

    #[test]
    fn help_is_reported_not_run() {
        let err = Cli::try_parse_from(["xrp-dashboard-updater", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
