use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Transport,
    Redirect,
    ClientError,
    ServerError,
    Unexpected,
}

impl StatusCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            300..=399 => Self::Redirect,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Unexpected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Redirect => "redirect",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Unexpected => "unexpected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CapturedOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl fmt::Display for CapturedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => writeln!(f, "exit code: {code}")?,
            None => writeln!(f, "exit code: <none>")?,
        }
        writeln!(f, "--- stdout ---")?;
        writeln!(f, "{}", self.stdout.trim_end())?;
        writeln!(f, "--- stderr ---")?;
        write!(f, "{}", self.stderr.trim_end())
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("provisioning failed: {message}\n{output}")]
    Provisioning {
        message: String,
        output: CapturedOutput,
    },
    #[error("teardown of {resource} failed: {message}")]
    Teardown { resource: String, message: String },
    #[error("command `{command}` timed out after {timeout:?}\n{output}")]
    CommandTimeout {
        command: String,
        timeout: Duration,
        output: CapturedOutput,
    },
    #[error("failed to launch `{command}`: {source}")]
    CommandLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("api {method} {path} failed ({}): {raw_body}", category.as_str())]
    Api {
        method: String,
        path: String,
        category: StatusCategory,
        status: Option<u16>,
        raw_body: String,
    },
    #[error("no {kind} named '{name}' exists")]
    NotFound { kind: String, name: String },
    #[error("expected exactly one {kind} named '{name}', found {count}")]
    AmbiguousResource {
        kind: String,
        name: String,
        count: usize,
    },
    #[error("assertion failed: {message}\n{output}")]
    ScenarioAssertion {
        message: String,
        output: CapturedOutput,
    },
    #[error("{description} not observed within {timeout:?} after {attempts} attempts; last observed: {last_value}")]
    PollTimeout {
        description: String,
        timeout: Duration,
        attempts: u32,
        last_value: String,
    },
    #[error("route {url} unreachable: {message}")]
    RouteUnreachable { url: String, message: String },
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize {context}: {source}")]
    Serialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("fixture io failed at {path}: {source}")]
    FixtureIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("buildpack archive could not be written: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("http client init failed: {0}")]
    HttpClientInit(String),
    #[error("scenario body panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

impl HarnessError {
    pub fn fixture_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FixtureIo {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provisioning { .. } => "provisioning",
            Self::Teardown { .. } => "teardown",
            Self::CommandTimeout { .. } => "command_timeout",
            Self::CommandLaunch { .. } => "command_launch",
            Self::Api { .. } => "api",
            Self::NotFound { .. } => "not_found",
            Self::AmbiguousResource { .. } => "ambiguous_resource",
            Self::ScenarioAssertion { .. } => "scenario_assertion",
            Self::PollTimeout { .. } => "poll_timeout",
            Self::RouteUnreachable { .. } => "route_unreachable",
            Self::Decode { .. } => "decode",
            Self::Serialize { .. } => "serialize",
            Self::FixtureIo { .. } => "fixture_io",
            Self::Archive(_) => "archive",
            Self::HttpClientInit(_) => "http_client_init",
            Self::Panicked(_) => "panicked",
            Self::Config(_) => "config",
        }
    }
}
