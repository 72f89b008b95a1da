use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::poll::PollPolicy;

pub const CONFIG_PATH_ENV: &str = "PLATFORM_ACCEPTANCE_CONFIG";
const API_ENV: &str = "PLATFORM_ACCEPTANCE_API";
const APPS_DOMAIN_ENV: &str = "PLATFORM_ACCEPTANCE_APPS_DOMAIN";
const ADMIN_PASSWORD_ENV: &str = "PLATFORM_ACCEPTANCE_ADMIN_PASSWORD";
const USER_PASSWORD_ENV: &str = "PLATFORM_ACCEPTANCE_USER_PASSWORD";
const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no harness config given; pass --config or set {CONFIG_PATH_ENV}")]
    MissingPath,
    #[error("failed to read harness config '{path}': {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse harness config TOML '{path}': {message}")]
    ParseToml { path: String, message: String },
    #[error("harness config field '{field}' is required")]
    MissingField { field: String },
    #[error("harness config field '{field}' is invalid: {message}")]
    InvalidField { field: String, message: String },
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub space: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            org: None,
            space: None,
        }
    }

    pub fn with_target(mut self, org: impl Into<String>, space: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self.space = Some(space.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("org", &self.org)
            .field("space", &self.space)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiTransportKind {
    Cli,
    Http,
}

impl ApiTransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Http => "http",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cli" => Some(Self::Cli),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Diego,
    Dea,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diego => "diego",
            Self::Dea => "dea",
        }
    }

    pub fn is_diego(self) -> bool {
        matches!(self, Self::Diego)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "diego" => Some(Self::Diego),
            "dea" => Some(Self::Dea),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub default: Duration,
    pub cf_push: Duration,
    pub long_curl: Duration,
    pub teardown: Duration,
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(30),
            cf_push: Duration::from_secs(120),
            long_curl: Duration::from_secs(120),
            teardown: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub api: String,
    pub apps_domain: String,
    pub skip_ssl_validation: bool,
    pub use_http: bool,
    pub cli_binary: String,
    pub api_transport: ApiTransportKind,
    pub backend: Option<Backend>,
    pub default_memory_limit: String,
    pub ruby_buildpack_name: String,
    pub nodejs_buildpack_name: String,
    pub dora_asset: Option<PathBuf>,
    pub admin: Credentials,
    pub user: Credentials,
    pub timeouts: Timeouts,
    pub timeout_scale: f64,
    pub work_root: PathBuf,
}

impl HarnessConfig {
    pub fn new(
        api: impl Into<String>,
        apps_domain: impl Into<String>,
        admin: Credentials,
        user: Credentials,
    ) -> Self {
        Self {
            api: api.into(),
            apps_domain: apps_domain.into(),
            skip_ssl_validation: false,
            use_http: true,
            cli_binary: String::from("cf"),
            api_transport: ApiTransportKind::Cli,
            backend: None,
            default_memory_limit: String::from("256M"),
            ruby_buildpack_name: String::from("ruby_buildpack"),
            nodejs_buildpack_name: String::from("nodejs_buildpack"),
            dora_asset: None,
            admin,
            user,
            timeouts: Timeouts::default(),
            timeout_scale: 1.0,
            work_root: std::env::temp_dir(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(
            raw.as_str(),
            path.display().to_string().as_str(),
            base_dir,
            &EnvOverrides::from_env(),
        )
    }

    pub fn from_toml_str(
        raw: &str,
        origin: &str,
        base_dir: &Path,
        overrides: &EnvOverrides,
    ) -> Result<Self, ConfigError> {
        let parsed: RawConfig = toml::from_str(raw).map_err(|e| ConfigError::ParseToml {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        build_config(parsed, base_dir, overrides)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("api", self.api.as_str())?;
        require_non_empty("apps_domain", self.apps_domain.as_str())?;
        require_non_empty("cli_binary", self.cli_binary.as_str())?;
        require_non_empty("default_memory_limit", self.default_memory_limit.as_str())?;
        require_non_empty("admin.username", self.admin.username.as_str())?;
        require_non_empty("admin.password", self.admin.password.as_str())?;
        require_non_empty("user.username", self.user.username.as_str())?;
        require_non_empty("user.password", self.user.password.as_str())?;
        if self.user.org.is_some() != self.user.space.is_some() {
            return Err(ConfigError::InvalidField {
                field: String::from("user"),
                message: String::from("org and space must be set together"),
            });
        }
        if !(self.timeout_scale.is_finite() && self.timeout_scale > 0.0) {
            return Err(ConfigError::InvalidField {
                field: String::from("timeouts.timeout_scale"),
                message: format!("must be > 0, got {}", self.timeout_scale),
            });
        }
        for (field, value) in [
            ("timeouts.default_secs", self.timeouts.default),
            ("timeouts.cf_push_secs", self.timeouts.cf_push),
            ("timeouts.long_curl_secs", self.timeouts.long_curl),
            ("timeouts.teardown_secs", self.timeouts.teardown),
            ("timeouts.poll_interval_ms", self.timeouts.poll_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidField {
                    field: field.to_string(),
                    message: String::from("must be > 0"),
                });
            }
            if value > MAX_TIMEOUT {
                return Err(ConfigError::InvalidField {
                    field: field.to_string(),
                    message: format!("must not exceed {}s", MAX_TIMEOUT.as_secs()),
                });
            }
        }
        for (field, value) in [
            ("timeouts.default_secs", self.timeouts.default),
            ("timeouts.cf_push_secs", self.timeouts.cf_push),
            ("timeouts.long_curl_secs", self.timeouts.long_curl),
            ("timeouts.teardown_secs", self.timeouts.teardown),
        ] {
            match scale_duration(value, self.timeout_scale) {
                Some(scaled) if scaled <= MAX_TIMEOUT => {}
                _ => {
                    return Err(ConfigError::InvalidField {
                        field: String::from("timeouts.timeout_scale"),
                        message: format!(
                            "{field} scaled by {} exceeds {}s",
                            self.timeout_scale,
                            MAX_TIMEOUT.as_secs()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn scaled(&self, timeout: Duration) -> Duration {
        scale_duration(timeout, self.timeout_scale)
            .unwrap_or(MAX_TIMEOUT)
            .min(MAX_TIMEOUT)
    }

    pub fn default_timeout(&self) -> Duration {
        self.scaled(self.timeouts.default)
    }

    pub fn cf_push_timeout(&self) -> Duration {
        self.scaled(self.timeouts.cf_push)
    }

    pub fn long_curl_timeout(&self) -> Duration {
        self.scaled(self.timeouts.long_curl)
    }

    pub fn teardown_timeout(&self) -> Duration {
        self.scaled(self.timeouts.teardown)
    }

    pub fn fast_poll(&self) -> PollPolicy {
        PollPolicy::new(self.default_timeout(), self.timeouts.poll_interval)
    }

    pub fn slow_poll(&self) -> PollPolicy {
        PollPolicy::new(self.cf_push_timeout(), self.timeouts.poll_interval)
    }

    pub fn api_url(&self) -> String {
        let api = self.api.trim().trim_end_matches('/');
        if api.starts_with("http://") || api.starts_with("https://") {
            api.to_string()
        } else {
            format!("https://{api}")
        }
    }

    pub fn app_host(&self, app_name: &str) -> String {
        format!(
            "{}.{}",
            app_name.to_ascii_lowercase(),
            self.apps_domain.trim().trim_start_matches('.')
        )
    }
}

pub fn resolve_config_path(explicit: Option<&str>) -> Result<PathBuf, ConfigError> {
    let from_env = std::env::var(CONFIG_PATH_ENV).ok();
    select_config_path(explicit, from_env.as_deref())
}

fn select_config_path(explicit: Option<&str>, from_env: Option<&str>) -> Result<PathBuf, ConfigError> {
    explicit
        .or(from_env)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(ConfigError::MissingPath)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    pub api: Option<String>,
    pub apps_domain: Option<String>,
    pub admin_password: Option<String>,
    pub user_password: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            api: non_empty_env(API_ENV),
            apps_domain: non_empty_env(APPS_DOMAIN_ENV),
            admin_password: non_empty_env(ADMIN_PASSWORD_ENV),
            user_password: non_empty_env(USER_PASSWORD_ENV),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    api: Option<String>,
    apps_domain: Option<String>,
    skip_ssl_validation: Option<bool>,
    use_http: Option<bool>,
    cli_binary: Option<String>,
    api_transport: Option<String>,
    backend: Option<String>,
    default_memory_limit: Option<String>,
    ruby_buildpack_name: Option<String>,
    nodejs_buildpack_name: Option<String>,
    work_root: Option<String>,
    #[serde(default)]
    assets: RawAssets,
    admin: Option<Credentials>,
    user: Option<Credentials>,
    #[serde(default)]
    timeouts: RawTimeouts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAssets {
    dora: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTimeouts {
    default_secs: Option<u64>,
    cf_push_secs: Option<u64>,
    long_curl_secs: Option<u64>,
    teardown_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    timeout_scale: Option<f64>,
}

fn build_config(
    raw: RawConfig,
    base_dir: &Path,
    overrides: &EnvOverrides,
) -> Result<HarnessConfig, ConfigError> {
    let api = overrides
        .api
        .clone()
        .or(raw.api)
        .ok_or_else(|| missing("api"))?;
    let apps_domain = overrides
        .apps_domain
        .clone()
        .or(raw.apps_domain)
        .ok_or_else(|| missing("apps_domain"))?;
    let mut admin = raw.admin.ok_or_else(|| missing("admin"))?;
    if let Some(password) = overrides.admin_password.clone() {
        admin.password = password;
    }
    let mut user = raw.user.ok_or_else(|| missing("user"))?;
    if let Some(password) = overrides.user_password.clone() {
        user.password = password;
    }

    let mut config = HarnessConfig::new(api, apps_domain, admin, user);
    if let Some(value) = raw.skip_ssl_validation {
        config.skip_ssl_validation = value;
    }
    if let Some(value) = raw.use_http {
        config.use_http = value;
    }
    if let Some(value) = raw.cli_binary {
        config.cli_binary = value;
    }
    if let Some(value) = raw.api_transport.as_deref() {
        config.api_transport =
            ApiTransportKind::parse(value).ok_or_else(|| ConfigError::InvalidField {
                field: String::from("api_transport"),
                message: format!("expected cli|http, got '{value}'"),
            })?;
    }
    if let Some(value) = raw.backend.as_deref() {
        config.backend = Some(Backend::parse(value).ok_or_else(|| ConfigError::InvalidField {
            field: String::from("backend"),
            message: format!("expected diego|dea, got '{value}'"),
        })?);
    }
    if let Some(value) = raw.default_memory_limit {
        config.default_memory_limit = value;
    }
    if let Some(value) = raw.ruby_buildpack_name {
        config.ruby_buildpack_name = value;
    }
    if let Some(value) = raw.nodejs_buildpack_name {
        config.nodejs_buildpack_name = value;
    }
    if let Some(value) = raw.work_root {
        config.work_root = resolve_relative(base_dir, value.as_str());
    }
    config.dora_asset = raw
        .assets
        .dora
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| resolve_relative(base_dir, v));

    let defaults = Timeouts::default();
    config.timeouts = Timeouts {
        default: raw
            .timeouts
            .default_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.default),
        cf_push: raw
            .timeouts
            .cf_push_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.cf_push),
        long_curl: raw
            .timeouts
            .long_curl_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.long_curl),
        teardown: raw
            .timeouts
            .teardown_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.teardown),
        poll_interval: raw
            .timeouts
            .poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval),
    };
    if let Some(scale) = raw.timeouts.timeout_scale {
        config.timeout_scale = scale;
    }

    config.validate()?;
    Ok(config)
}

fn scale_duration(timeout: Duration, scale: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(timeout.as_secs_f64() * scale).ok()
}

fn resolve_relative(base_dir: &Path, value: &str) -> PathBuf {
    let candidate = PathBuf::from(value);
    if candidate.is_absolute() {
        candidate
    } else {
        base_dir.join(candidate)
    }
}

fn missing(field: &str) -> ConfigError {
    ConfigError::MissingField {
        field: field.to_string(),
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(missing(field));
    }
    Ok(())
}
