use crate::error::{Result, ScreenerError};
use log::info;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.screener.in";
pub const DEFAULT_SCREENS: &[&str] = &["screens/2940613/v200-refined/"];
pub const LOGIN_PATH: &str = "login/";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    UrlPattern,
    DetailPage,
}

impl FromStr for StrategyKind {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "url" | "url-pattern" => Ok(StrategyKind::UrlPattern),
            "detail" | "detail-page" => Ok(StrategyKind::DetailPage),
            other => Err(ScreenerError::Config(format!(
                "unknown strategy '{}', expected 'url' or 'detail-page'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub login_wait: Duration,
    pub table_wait: Duration,
    pub settle: Duration,
    pub poll: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            login_wait: Duration::from_secs(1),
            table_wait: Duration::from_secs(10),
            settle: Duration::from_secs(3),
            poll: Duration::from_millis(250),
        }
    }
}

impl Timing {
    pub fn immediate() -> Self {
        Self {
            login_wait: Duration::ZERO,
            table_wait: Duration::ZERO,
            settle: Duration::ZERO,
            poll: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenTarget {
    path: String,
    url: Url,
}

impl ScreenTarget {
    pub fn new(base_url: &Url, path: &str) -> Result<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ScreenerError::Config("empty screen path".to_string()));
        }
        let url = base_url.join(path.trim_start_matches('/'))?;
        Ok(Self {
            path: path.to_string(),
            url,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn output_file_name(&self) -> String {
        let slug = self
            .url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.trim().is_empty()).last())
            .map(str::to_string)
            .or_else(|| self.url.host_str().map(str::to_string))
            .unwrap_or_else(|| "screen".to_string());
        format!("{}.txt", slug)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub credentials: Credentials,
    pub screens: Vec<ScreenTarget>,
    pub output_dir: PathBuf,
    pub strategy: StrategyKind,
    pub timing: Timing,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let username = non_empty("username")
            .ok_or_else(|| ScreenerError::Config("`username` is not set".to_string()))?;
        let password = non_empty("password")
            .ok_or_else(|| ScreenerError::Config("`password` is not set".to_string()))?;

        let base = non_empty("SCREENER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = normalize_base(&base)?;

        let screen_paths: Vec<String> = match non_empty("SCREENER_SCREENS") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_SCREENS.iter().map(|s| s.to_string()).collect(),
        };
        if screen_paths.is_empty() {
            return Err(ScreenerError::Config("no screens configured".to_string()));
        }
        let screens = screen_paths
            .iter()
            .map(|p| ScreenTarget::new(&base_url, p))
            .collect::<Result<Vec<_>>>()?;

        let output_dir = non_empty("SCREENER_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let strategy = match non_empty("SCREENER_STRATEGY") {
            Some(s) => s.parse()?,
            None => StrategyKind::default(),
        };

        let mut timing = Timing::default();
        if let Some(secs) = non_empty("SCREENER_LOGIN_WAIT_SECS") {
            timing.login_wait = parse_secs("SCREENER_LOGIN_WAIT_SECS", &secs)?;
        }
        if let Some(secs) = non_empty("SCREENER_TABLE_WAIT_SECS") {
            timing.table_wait = parse_secs("SCREENER_TABLE_WAIT_SECS", &secs)?;
        }
        if let Some(secs) = non_empty("SCREENER_SETTLE_SECS") {
            timing.settle = parse_secs("SCREENER_SETTLE_SECS", &secs)?;
        }

        info!(
            "Loaded config: base={} screens={} strategy={:?}",
            base_url,
            screens.len(),
            strategy
        );

        Ok(Self {
            base_url,
            credentials: Credentials { username, password },
            screens,
            output_dir,
            strategy,
            timing,
        })
    }

    pub fn login_url(&self) -> Result<Url> {
        Ok(self.base_url.join(LOGIN_PATH)?)
    }
}

fn normalize_base(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Ok(Url::parse(&with_slash)?)
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| ScreenerError::Config(format!("{} must be a non-negative number, got '{}'", key, value)))
}
