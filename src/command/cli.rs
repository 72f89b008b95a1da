use std::path::PathBuf;
use std::time::Duration;

use crate::api::ApiMethod;
use crate::command::CommandSpec;
use crate::identity::SessionEnv;

pub const CF_HOME_ENV: &str = "CF_HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushArgs {
    pub app: String,
    pub memory_limit: String,
    pub path: PathBuf,
    pub domain: String,
    pub buildpack: Option<String>,
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfCommand {
    Api {
        endpoint: String,
        skip_ssl_validation: bool,
    },
    Auth {
        username: String,
        password: String,
    },
    Target {
        org: String,
        space: String,
    },
    OauthToken,
    CreateBuildpack {
        name: String,
        archive: PathBuf,
        position: u32,
    },
    DeleteBuildpack {
        name: String,
    },
    Push(PushArgs),
    Start {
        app: String,
    },
    Stop {
        app: String,
    },
    Delete {
        app: String,
    },
    AppGuid {
        app: String,
    },
    App {
        app: String,
    },
    RecentLogs {
        app: String,
    },
    Curl {
        path: String,
        method: ApiMethod,
        body: Option<String>,
        include_headers: bool,
    },
}

impl CfCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Api { .. } => "api",
            Self::Auth { .. } => "auth",
            Self::Target { .. } => "target",
            Self::OauthToken => "oauth-token",
            Self::CreateBuildpack { .. } => "create-buildpack",
            Self::DeleteBuildpack { .. } => "delete-buildpack",
            Self::Push(_) => "push",
            Self::Start { .. } => "start",
            Self::Stop { .. } => "stop",
            Self::Delete { .. } => "delete",
            Self::AppGuid { .. } | Self::App { .. } => "app",
            Self::RecentLogs { .. } => "logs",
            Self::Curl { .. } => "curl",
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.name().to_string()];
        match self {
            Self::Api {
                endpoint,
                skip_ssl_validation,
            } => {
                args.push(endpoint.clone());
                if *skip_ssl_validation {
                    args.push(String::from("--skip-ssl-validation"));
                }
            }
            Self::Auth { username, password } => {
                args.push(username.clone());
                args.push(password.clone());
            }
            Self::Target { org, space } => {
                args.extend([
                    String::from("-o"),
                    org.clone(),
                    String::from("-s"),
                    space.clone(),
                ]);
            }
            Self::OauthToken => {}
            Self::CreateBuildpack {
                name,
                archive,
                position,
            } => {
                args.push(name.clone());
                args.push(archive.to_string_lossy().to_string());
                args.push(position.to_string());
            }
            Self::DeleteBuildpack { name } => {
                args.push(name.clone());
                args.push(String::from("-f"));
            }
            Self::Push(push) => {
                args.extend([
                    push.app.clone(),
                    String::from("--no-start"),
                    String::from("-m"),
                    push.memory_limit.clone(),
                    String::from("-p"),
                    push.path.to_string_lossy().to_string(),
                    String::from("-d"),
                    push.domain.clone(),
                ]);
                if let Some(buildpack) = push.buildpack.as_ref() {
                    args.push(String::from("-b"));
                    args.push(buildpack.clone());
                }
                if let Some(command) = push.start_command.as_ref() {
                    args.push(String::from("-c"));
                    args.push(command.clone());
                }
            }
            Self::Start { app } | Self::Stop { app } | Self::App { app } => {
                args.push(app.clone());
            }
            Self::Delete { app } => {
                args.extend([app.clone(), String::from("-f"), String::from("-r")]);
            }
            Self::AppGuid { app } => {
                args.push(app.clone());
                args.push(String::from("--guid"));
            }
            Self::RecentLogs { app } => {
                args.push(app.clone());
                args.push(String::from("--recent"));
            }
            Self::Curl {
                path,
                method,
                body,
                include_headers,
            } => {
                args.push(path.clone());
                if *include_headers {
                    args.push(String::from("-i"));
                }
                if *method != ApiMethod::Get {
                    args.push(String::from("-X"));
                    args.push(method.as_str().to_string());
                }
                if let Some(body) = body.as_ref() {
                    args.push(String::from("-d"));
                    args.push(body.clone());
                }
            }
        }
        args
    }

    pub fn redacted_positions(&self) -> Vec<usize> {
        match self {
            Self::Auth { .. } => vec![2],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfCli {
    binary: String,
}

impl CfCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        self.binary.as_str()
    }

    pub fn spec(&self, command: &CfCommand, session: &SessionEnv, timeout: Duration) -> CommandSpec {
        CommandSpec::new(self.binary.clone(), command.args(), timeout)
            .with_env(CF_HOME_ENV, session.home().to_string_lossy().to_string())
            .with_env("CF_COLOR", "false")
            .with_redacted_args(command.redacted_positions())
    }
}
