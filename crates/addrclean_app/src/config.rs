//! Client configuration: a RON file plus a few command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use addrclean_engine::ClientSettings;
use addrclean_logging::{LevelFilter, LogDestination};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "./addrclean.ron";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_download_bytes: u64,
    pub download_dir: PathBuf,
    /// Remembers the last job id between runs.
    pub session_file: PathBuf,
    pub log_destination: LogOutput,
    pub log_file: PathBuf,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutput {
    File,
    Terminal,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let settings = ClientSettings::default();
        Self {
            server_url: settings.base_url,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            max_download_bytes: settings.max_download_bytes,
            download_dir: PathBuf::from("./downloads"),
            session_file: PathBuf::from("./.addrclean_session.ron"),
            log_destination: LogOutput::File,
            log_file: PathBuf::from("./addrclean.log"),
            log_level: LogLevel::Info,
        }
    }
}

impl ClientConfig {
    /// Loads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()));
            }
        };
        ron::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.server_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_download_bytes: self.max_download_bytes,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        if self.poll_interval_ms == 0 {
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
        } else {
            Duration::from_millis(self.poll_interval_ms)
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match self.log_destination {
            LogOutput::File => LogDestination::File(self.log_file.clone()),
            LogOutput::Terminal => LogDestination::Terminal,
            LogOutput::Both => LogDestination::Both(self.log_file.clone()),
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs {
    pub config_path: PathBuf,
    pub server_url: Option<String>,
    /// Job to resume at startup.
    pub job_id: Option<String>,
    pub help: bool,
}

impl Default for LaunchArgs {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            server_url: None,
            job_id: None,
            help: false,
        }
    }
}

pub const ARGS_USAGE: &str = "\
usage: addrclean [--config <path>] [--server <url>] [--job <id>]

  --config <path>  RON config file (default ./addrclean.ron)
  --server <url>   server root, overrides the config file
  --job <id>       resume this job instead of the last remembered one";

/// Parses `--flag value` and `--flag=value` options.
pub fn parse_args<I>(args: I) -> anyhow::Result<LaunchArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = LaunchArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> anyhow::Result<String> {
            match inline.clone().or_else(|| args.next()) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => bail!("{name} needs a value"),
            }
        };
        match flag.as_str() {
            "--config" => parsed.config_path = PathBuf::from(value("--config")?),
            "--server" => parsed.server_url = Some(value("--server")?),
            "--job" => parsed.job_id = Some(value("--job")?),
            "-h" | "--help" => parsed.help = true,
            other => bail!("unknown argument {other:?}\n\n{ARGS_USAGE}"),
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::{parse_args, ClientConfig, LaunchArgs, LogLevel, LogOutput};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ClientConfig::load(&temp.path().join("absent.ron")).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("addrclean.ron");
        fs::write(
            &path,
            "(server_url: \"http://10.0.0.5:8000\", log_destination: Both, log_level: Debug)",
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.server_url, "http://10.0.0.5:8000");
        assert_eq!(config.log_destination, LogOutput::Both);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.client_settings().base_url, "http://10.0.0.5:8000");
    }

    #[test]
    fn malformed_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("addrclean.ron");
        fs::write(&path, "(server_url: 42").unwrap();
        assert!(ClientConfig::load(&path).is_err());
    }

    #[test]
    fn zero_poll_interval_falls_back_to_one_second() {
        let config = ClientConfig {
            poll_interval_ms: 0,
            ..ClientConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn args_accept_separate_and_inline_values() {
        let parsed = parse_args(args(&["--job", "J1", "--server=http://h:1", "--config", "c.ron"]))
            .unwrap();
        assert_eq!(
            parsed,
            LaunchArgs {
                config_path: PathBuf::from("c.ron"),
                server_url: Some("http://h:1".to_string()),
                job_id: Some("J1".to_string()),
                help: false,
            }
        );
    }

    #[test]
    fn args_reject_unknown_and_missing_values() {
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["--job"])).is_err());
        assert!(parse_args(args(&["--job="])).is_err());
    }

    #[test]
    fn no_args_gives_defaults() {
        assert_eq!(parse_args(Vec::new()).unwrap(), LaunchArgs::default());
        assert!(parse_args(args(&["--help"])).unwrap().help);
    }
}
