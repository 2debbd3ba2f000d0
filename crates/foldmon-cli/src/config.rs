//! Monitor settings from the command line and environment.

use std::time::Duration;

use foldmon_client::DEFAULT_PORT;

/// What to monitor and how often to refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub host: String,
    pub port: u16,
    /// Empty means the client accepts unauthenticated commands.
    pub password: String,
    pub update_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            password: String::new(),
            update_interval: Duration::from_secs(5),
        }
    }
}

impl MonitorConfig {
    /// Build from `foldmon [host] [port] [password]`, falling back to
    /// `FOLDMON_HOST`, `FOLDMON_PORT`, `FOLDMON_PASSWORD` and
    /// `FOLDMON_UPDATE_SECS`.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        Self::resolve(args, |name| std::env::var(name).ok())
    }

    fn resolve<F>(args: &[String], env: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = args
            .first()
            .cloned()
            .or_else(|| env("FOLDMON_HOST"))
            .unwrap_or(defaults.host);

        let port = match args.get(1).cloned().or_else(|| env("FOLDMON_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| format!("Invalid port: {}", raw))?,
            None => defaults.port,
        };

        let password = args
            .get(2)
            .cloned()
            .or_else(|| env("FOLDMON_PASSWORD"))
            .unwrap_or(defaults.password);

        let update_interval = match env("FOLDMON_UPDATE_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("Invalid FOLDMON_UPDATE_SECS: {}", raw))?,
            None => defaults.update_interval,
        };

        if host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }

        Ok(Self {
            host,
            port,
            password,
            update_interval,
        })
    }
}
