#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use platform_acceptance::api::transport::CliCurlTransport;
use platform_acceptance::api::{ApiRequest, ApiResponse, ApiTransport, SharedApiTransport};
use platform_acceptance::command::{CommandExecutor, CommandResult, CommandRunner, CommandSpec};
use platform_acceptance::config::{Credentials, HarnessConfig};
use platform_acceptance::error::{CapturedOutput, HarnessError, HarnessResult};
use platform_acceptance::fixtures::buildpack::STAGING_MARKER;
use platform_acceptance::identity::SessionEnv;
use platform_acceptance::probe::{ProbeResponse, RouteProbe};
use platform_acceptance::scenario::ScenarioFactory;
use serde_json::{json, Value};
use uuid::Uuid;

pub const API_HOST: &str = "api.fake.test";
pub const APPS_DOMAIN: &str = "apps.fake.test";
pub const ORG: &str = "cats-org";
pub const SPACE: &str = "cats-space";

pub fn test_config() -> HarnessConfig {
    let mut config = HarnessConfig::new(
        API_HOST,
        APPS_DOMAIN,
        Credentials::new("admin", "admin-secret"),
        Credentials::new("cats-user", "user-secret").with_target(ORG, SPACE),
    );
    config.work_root = std::env::temp_dir().join(format!("pa_it_{}", Uuid::new_v4()));
    config.timeouts.poll_interval = Duration::from_millis(5);
    config
}

pub fn dora_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pa_dora_{}", Uuid::new_v4()));
    fs::create_dir_all(dir.as_path()).expect("dora dir should be created");
    fs::write(dir.join("config.ru"), "require './dora'\nrun Dora\n")
        .expect("config.ru should be written");
    fs::write(dir.join("Gemfile"), "source 'https://rubygems.org'\ngem 'sinatra'\n")
        .expect("Gemfile should be written");
    dir
}

pub fn factory(platform: &Arc<FakePlatform>, config: HarnessConfig) -> ScenarioFactory {
    factory_with_transport(platform, config, Arc::new(CliCurlTransport))
}

pub fn factory_with_transport(
    platform: &Arc<FakePlatform>,
    config: HarnessConfig,
    transport: SharedApiTransport,
) -> ScenarioFactory {
    ScenarioFactory::new(
        Arc::new(config),
        platform.clone(),
        transport,
        platform.clone(),
    )
}

pub fn cleanup_work_root(factory: &ScenarioFactory) {
    let _ = fs::remove_dir_all(factory.config().work_root.as_path());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildpackRecord {
    pub guid: String,
    pub name: String,
    pub position: u32,
    pub enabled: bool,
    pub detect_marker: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum RouteState {
    #[default]
    Down,
    Up {
        env: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone)]
pub struct AppRecord {
    pub guid: String,
    pub name: String,
    pub owner: String,
    pub files: BTreeSet<String>,
    pub procfile_web: Option<String>,
    pub buildpack: Option<String>,
    pub command: Option<String>,
    pub detected_start_command: String,
    pub diego: Option<bool>,
    pub started: bool,
    desired: RouteState,
    visible: RouteState,
    pending_probes: u32,
}

impl AppRecord {
    fn observe(&mut self) -> RouteState {
        if self.pending_probes > 0 {
            self.pending_probes -= 1;
        } else {
            self.visible = self.desired.clone();
        }
        self.visible.clone()
    }
}

#[derive(Debug, Clone, Default)]
struct Behaviour {
    route_lag: u32,
    ignore_disable: bool,
    ignore_procfiles: bool,
    truncate_payloads_at: Option<usize>,
    failing_deletes: BTreeSet<String>,
    push_timeouts: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    domain: String,
    accounts: HashMap<String, (String, bool)>,
    sessions: HashMap<PathBuf, String>,
    system_buildpacks: BTreeSet<String>,
    buildpacks: Vec<BuildpackRecord>,
    apps: BTreeMap<String, AppRecord>,
    journal: Vec<(String, String)>,
    behaviour: Behaviour,
}

pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn for_config(config: &HarnessConfig) -> Self {
        let mut state = State {
            domain: config.apps_domain.clone(),
            ..State::default()
        };
        state.accounts.insert(
            config.admin.username.clone(),
            (config.admin.password.clone(), true),
        );
        state.accounts.insert(
            config.user.username.clone(),
            (config.user.password.clone(), false),
        );
        state
            .system_buildpacks
            .insert(config.ruby_buildpack_name.clone());
        state
            .system_buildpacks
            .insert(config.nodejs_buildpack_name.clone());
        Self {
            state: Mutex::new(state),
        }
    }

    fn behaviour(&mut self) -> &mut Behaviour {
        &mut self
            .state
            .get_mut()
            .expect("platform mutex poisoned")
            .behaviour
    }

    pub fn with_route_lag(mut self, probes: u32) -> Self {
        self.behaviour().route_lag = probes;
        self
    }

    pub fn ignoring_buildpack_disable(mut self) -> Self {
        self.behaviour().ignore_disable = true;
        self
    }

    pub fn ignoring_procfiles(mut self) -> Self {
        self.behaviour().ignore_procfiles = true;
        self
    }

    pub fn truncating_payloads_at(mut self, bytes: usize) -> Self {
        self.behaviour().truncate_payloads_at = Some(bytes);
        self
    }

    pub fn failing_deletes_of(mut self, name: &str) -> Self {
        self.behaviour().failing_deletes.insert(name.to_string());
        self
    }

    pub fn timing_out_pushes_of(mut self, name: &str) -> Self {
        self.behaviour().push_timeouts.insert(name.to_string());
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("platform mutex poisoned")
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.lock().journal.clone()
    }

    pub fn commands_starting_with(&self, prefix: &str) -> Vec<(String, String)> {
        self.commands()
            .into_iter()
            .filter(|(_, line)| line.starts_with(prefix))
            .collect()
    }

    pub fn buildpack_names(&self) -> Vec<String> {
        self.lock().buildpacks.iter().map(|b| b.name.clone()).collect()
    }

    pub fn app_names(&self) -> Vec<String> {
        self.lock().apps.keys().cloned().collect()
    }

    pub fn app(&self, name: &str) -> Option<AppRecord> {
        self.lock().apps.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        let state = self.lock();
        state.buildpacks.is_empty() && state.apps.is_empty()
    }

    pub fn seed_app(&self, name: &str, owner: &str) {
        let record = new_app(name, owner);
        self.lock().apps.insert(name.to_string(), record);
    }
}

fn new_app(name: &str, owner: &str) -> AppRecord {
    AppRecord {
        guid: Uuid::new_v4().to_string(),
        name: name.to_string(),
        owner: owner.to_string(),
        files: BTreeSet::new(),
        procfile_web: None,
        buildpack: None,
        command: None,
        detected_start_command: String::new(),
        diego: None,
        started: false,
        desired: RouteState::Down,
        visible: RouteState::Down,
        pending_probes: 0,
    }
}

fn outcome(exit_code: i32, stdout: impl Into<String>) -> HarnessResult<CommandResult> {
    Ok(CommandResult {
        exit_code,
        stdout: stdout.into(),
        stderr: String::new(),
        duration: Duration::from_millis(1),
    })
}

fn ok(stdout: impl Into<String>) -> HarnessResult<CommandResult> {
    outcome(0, stdout)
}

fn failed(stdout: impl Into<String>) -> HarnessResult<CommandResult> {
    outcome(1, stdout)
}

fn arg(args: &[String], idx: usize) -> &str {
    args.get(idx).map(String::as_str).unwrap_or_default()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|idx| args.get(idx + 1))
        .map(String::as_str)
}

fn read_detect_marker(archive: &Path) -> Option<String> {
    let file = File::open(archive).ok()?;
    let mut zip = zip::ZipArchive::new(file).ok()?;
    let mut detect = zip.by_name("bin/detect").ok()?;
    let mut script = String::new();
    detect.read_to_string(&mut script).ok()?;
    let start = script.find("${1}/")? + "${1}/".len();
    let end = script[start..].find('"')?;
    Some(script[start..start + end].to_string())
}

fn list_files(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn procfile_web(dir: &Path) -> Option<String> {
    let raw = fs::read_to_string(dir.join("Procfile")).ok()?;
    raw.lines()
        .find_map(|line| line.strip_prefix("web:"))
        .map(|cmd| cmd.trim().to_string())
}

fn leading_env(command: &str) -> BTreeMap<String, String> {
    command
        .split_whitespace()
        .map_while(|token| token.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn query_name(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "q")
        .and_then(|(_, value)| value.strip_prefix("name:").map(str::to_string))
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Unknown",
    }
}

fn not_authorized() -> (u16, String) {
    (
        403,
        json!({
            "code": 10003,
            "description": "You are not authorized to perform the requested action",
            "error_code": "CF-NotAuthorized"
        })
        .to_string(),
    )
}

fn not_found() -> (u16, String) {
    (
        404,
        json!({"code": 10000, "description": "Unknown request", "error_code": "CF-NotFound"})
            .to_string(),
    )
}

fn envelope(resources: Vec<Value>) -> (u16, String) {
    (
        200,
        json!({"total_results": resources.len(), "resources": resources}).to_string(),
    )
}

impl BuildpackRecord {
    fn resource(&self) -> Value {
        json!({
            "metadata": {"guid": self.guid, "url": format!("/v2/buildpacks/{}", self.guid)},
            "entity": {
                "name": self.name,
                "position": self.position,
                "enabled": self.enabled,
                "locked": false,
                "filename": "buildpack.zip"
            }
        })
    }
}

impl AppRecord {
    fn resource(&self) -> Value {
        json!({
            "metadata": {"guid": self.guid, "url": format!("/v2/apps/{}", self.guid)},
            "entity": {
                "name": self.name,
                "command": self.command,
                "detected_start_command": self.detected_start_command,
                "state": if self.started { "STARTED" } else { "STOPPED" },
                "diego": self.diego
            }
        })
    }
}

impl State {
    fn is_admin(&self, user: &str) -> bool {
        self.accounts
            .get(user)
            .map(|(_, admin)| *admin)
            .unwrap_or(false)
    }

    fn auth(&mut self, home: &Path, username: &str, password: &str) -> HarnessResult<CommandResult> {
        match self.accounts.get(username) {
            Some((expected, _)) if expected == password => {
                self.sessions
                    .insert(home.to_path_buf(), username.to_string());
                ok("API endpoint: https://api.fake.test\nAuthenticating...\nOK\n")
            }
            _ => failed("Authenticating...\nCredentials were rejected, please try again.\nFAILED\n"),
        }
    }

    fn dispatch(
        &mut self,
        command: &str,
        args: &[String],
        user: &str,
        spec: &CommandSpec,
    ) -> HarnessResult<CommandResult> {
        match command {
            "target" => ok(format!(
                "API endpoint: https://{API_HOST}\nUser: {user}\nOrg: {}\nSpace: {}\n",
                arg(args, 2),
                arg(args, 4)
            )),
            "oauth-token" => ok(format!("bearer token-{user}\n")),
            "create-buildpack" => self.create_buildpack(args, user),
            "delete-buildpack" => self.delete_buildpack(arg(args, 1), user),
            "push" => self.push(args, user, spec),
            "start" => self.start(arg(args, 1)),
            "stop" => self.stop(arg(args, 1)),
            "delete" => self.delete_app(arg(args, 1), user),
            "app" => self.app(arg(args, 1), args.iter().any(|a| a == "--guid")),
            "logs" => ok(format!(
                "Connected, dumping recent logs for app {} in org {ORG} / space {SPACE} as {user}...\n",
                arg(args, 1)
            )),
            "curl" => {
                let (status, body) = self.api(
                    flag_value(args, "-X").unwrap_or("GET"),
                    arg(args, 1),
                    flag_value(args, "-d"),
                    user,
                );
                ok(format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: application/json;charset=utf-8\r\n\r\n{body}",
                    reason(status)
                ))
            }
            other => failed(format!("'{other}' is not a registered command. See 'cf help'\n")),
        }
    }

    fn create_buildpack(&mut self, args: &[String], user: &str) -> HarnessResult<CommandResult> {
        let name = arg(args, 1);
        if !self.is_admin(user) {
            return failed(format!(
                "Creating buildpack {name}...\nFAILED\nServer error, status code: 403, error code: 10003, message: You are not authorized to perform the requested action\n"
            ));
        }
        if self.buildpacks.iter().any(|b| b.name == name) {
            return failed(format!(
                "Creating buildpack {name}...\nFAILED\nBuildpack {name} already exists\n"
            ));
        }
        self.buildpacks.push(BuildpackRecord {
            guid: Uuid::new_v4().to_string(),
            name: name.to_string(),
            position: arg(args, 3).parse().unwrap_or(0),
            enabled: true,
            detect_marker: read_detect_marker(Path::new(arg(args, 2))),
        });
        ok(format!(
            "Creating buildpack {name}...\nOK\n\nUploading buildpack {name}...\nDone uploading\nOK\n"
        ))
    }

    fn delete_buildpack(&mut self, name: &str, user: &str) -> HarnessResult<CommandResult> {
        if !self.is_admin(user) {
            return failed(format!(
                "Deleting buildpack {name}...\nFAILED\nServer error, status code: 403\n"
            ));
        }
        if self.behaviour.failing_deletes.contains(name) {
            return failed(format!(
                "Deleting buildpack {name}...\nFAILED\nServer error, status code: 500\n"
            ));
        }
        let before = self.buildpacks.len();
        self.buildpacks.retain(|b| b.name != name);
        if self.buildpacks.len() == before {
            return ok(format!(
                "Deleting buildpack {name}...\nOK\n\nBuildpack {name} does not exist.\n"
            ));
        }
        ok(format!("Deleting buildpack {name}...\nOK\n"))
    }

    fn push(
        &mut self,
        args: &[String],
        user: &str,
        spec: &CommandSpec,
    ) -> HarnessResult<CommandResult> {
        let name = arg(args, 1).to_string();
        let dir = PathBuf::from(flag_value(args, "-p").unwrap_or_default());
        let banner = format!("Creating app {name} in org {ORG} / space {SPACE} as {user}...\n");

        let record = self
            .apps
            .entry(name.clone())
            .or_insert_with(|| new_app(name.as_str(), user));
        record.files = list_files(dir.as_path());
        record.procfile_web = procfile_web(dir.as_path());
        record.buildpack = flag_value(args, "-b").map(str::to_string);
        record.command = flag_value(args, "-c").map(str::to_string);

        if self.behaviour.push_timeouts.contains(name.as_str()) {
            return Err(HarnessError::CommandTimeout {
                command: spec.display(),
                timeout: spec.timeout,
                output: CapturedOutput {
                    exit_code: None,
                    stdout: banner,
                    stderr: String::new(),
                },
            });
        }
        ok(format!("{banner}OK\n\nUploading {name}...\nDone uploading\nOK\n"))
    }

    fn detect(&self, app: &AppRecord) -> Option<String> {
        if let Some(explicit) = app.buildpack.as_deref() {
            if self.system_buildpacks.contains(explicit) {
                return Some(format!("-----> Buildpack: {explicit}"));
            }
            return self
                .buildpacks
                .iter()
                .any(|b| b.name == explicit)
                .then(|| String::from(STAGING_MARKER));
        }
        let mut candidates: Vec<&BuildpackRecord> = self
            .buildpacks
            .iter()
            .filter(|b| b.enabled || self.behaviour.ignore_disable)
            .collect();
        candidates.sort_by_key(|b| b.position);
        candidates
            .into_iter()
            .find(|b| {
                b.detect_marker
                    .as_ref()
                    .map(|marker| app.files.contains(marker))
                    .unwrap_or(false)
            })
            .map(|_| String::from(STAGING_MARKER))
    }

    fn start(&mut self, name: &str) -> HarnessResult<CommandResult> {
        let Some(app) = self.apps.get(name) else {
            return failed(format!("App {name} not found\nFAILED\n"));
        };
        let Some(staging) = self.detect(app) else {
            return failed(format!(
                "Starting app {name} in org {ORG} / space {SPACE}...\nStaging error: cannot get instances since staging failed\nNoAppDetectedError\nFAILED\n"
            ));
        };

        let lag = self.behaviour.route_lag;
        let ignore_procfiles = self.behaviour.ignore_procfiles;
        let Some(app) = self.apps.get_mut(name) else {
            return failed(format!("App {name} not found\nFAILED\n"));
        };
        if !ignore_procfiles {
            app.detected_start_command = app.procfile_web.clone().unwrap_or_default();
        }
        let effective = app
            .command
            .clone()
            .unwrap_or_else(|| app.detected_start_command.clone());
        app.started = true;
        app.desired = RouteState::Up {
            env: leading_env(effective.as_str()),
        };
        app.pending_probes = lag;
        ok(format!(
            "Starting app {name} in org {ORG} / space {SPACE}...\n{staging}\n\n0 of 1 instances running, 1 starting\n1 of 1 instances running\n\nApp started\n\nOK\n"
        ))
    }

    fn stop(&mut self, name: &str) -> HarnessResult<CommandResult> {
        let lag = self.behaviour.route_lag;
        let Some(app) = self.apps.get_mut(name) else {
            return failed(format!("App {name} not found\nFAILED\n"));
        };
        app.started = false;
        app.desired = RouteState::Down;
        app.pending_probes = lag;
        ok(format!("Stopping app {name} in org {ORG} / space {SPACE}...\nOK\n"))
    }

    fn delete_app(&mut self, name: &str, user: &str) -> HarnessResult<CommandResult> {
        let banner = format!("Deleting app {name} in org {ORG} / space {SPACE} as {user}...\nOK\n");
        if self.behaviour.failing_deletes.contains(name) {
            return failed(format!(
                "Deleting app {name} in org {ORG} / space {SPACE} as {user}...\nFAILED\nServer error, status code: 500\n"
            ));
        }
        match self.apps.remove(name) {
            Some(_) => ok(banner),
            None => ok(format!("{banner}\nApp {name} does not exist.\n")),
        }
    }

    fn app(&self, name: &str, guid_only: bool) -> HarnessResult<CommandResult> {
        let Some(app) = self.apps.get(name) else {
            return failed(format!("App {name} not found\nFAILED\n"));
        };
        if guid_only {
            return ok(format!("{}\n", app.guid));
        }
        ok(format!(
            "Showing health and status for app {name} in org {ORG} / space {SPACE}...\nrequested state: {}\n",
            if app.started { "started" } else { "stopped" }
        ))
    }

    fn api(&mut self, method: &str, path: &str, body: Option<&str>, user: &str) -> (u16, String) {
        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        let segments: Vec<&str> = route.trim_start_matches('/').split('/').collect();
        let payload: Value = body
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null);

        match (method, segments.as_slice()) {
            ("GET", ["v2", "buildpacks"]) => {
                let name = query_name(query);
                envelope(
                    self.buildpacks
                        .iter()
                        .filter(|b| name.as_deref().map_or(true, |n| n == b.name))
                        .map(BuildpackRecord::resource)
                        .collect(),
                )
            }
            ("PUT", ["v2", "buildpacks", guid]) => {
                if !self.is_admin(user) {
                    return not_authorized();
                }
                let Some(record) = self.buildpacks.iter_mut().find(|b| b.guid == *guid) else {
                    return not_found();
                };
                if let Some(enabled) = payload.get("enabled").and_then(Value::as_bool) {
                    record.enabled = enabled;
                }
                (201, record.resource().to_string())
            }
            ("GET", ["v2", "apps"]) => {
                let name = query_name(query);
                envelope(
                    self.apps
                        .values()
                        .filter(|a| name.as_deref().map_or(true, |n| n == a.name))
                        .map(AppRecord::resource)
                        .collect(),
                )
            }
            ("PUT", ["v2", "apps", guid]) => {
                let Some(record) = self.apps.values_mut().find(|a| a.guid == *guid) else {
                    return not_found();
                };
                if let Some(command) = payload.get("command").and_then(Value::as_str) {
                    record.command = Some(command.to_string());
                }
                if let Some(diego) = payload.get("diego").and_then(Value::as_bool) {
                    record.diego = Some(diego);
                }
                (201, record.resource().to_string())
            }
            _ => not_found(),
        }
    }
}

impl CommandRunner for FakePlatform {
    fn run(&self, spec: &CommandSpec) -> HarnessResult<CommandResult> {
        let home = spec.env_value("CF_HOME").map(PathBuf::from).unwrap_or_default();
        let label = home
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut state = self.lock();
        state.journal.push((label, spec.args.join(" ")));

        let args = spec.args.as_slice();
        match args.first().map(String::as_str) {
            Some("api") => ok(format!("Setting api endpoint to {}...\nOK\n", arg(args, 1))),
            Some("auth") => state.auth(home.as_path(), arg(args, 1), arg(args, 2)),
            Some(command) => {
                let Some(user) = state.sessions.get(&home).cloned() else {
                    return failed("Not logged in. Use 'cf login' to log in.\nFAILED\n");
                };
                state.dispatch(command, args, user.as_str(), spec)
            }
            None => failed("Usage: cf COMMAND\n"),
        }
    }
}

impl ApiTransport for FakePlatform {
    fn send(
        &self,
        _executor: &CommandExecutor,
        session: &SessionEnv,
        request: &ApiRequest,
    ) -> HarnessResult<ApiResponse> {
        let mut state = self.lock();
        state.journal.push((
            session.identity().label().to_string(),
            format!("http {} {}", request.method.as_str(), request.path),
        ));
        let Some(user) = state.sessions.get(session.home()).cloned() else {
            return Ok(ApiResponse {
                status: 401,
                body: json!({"error": "invalid_token"}).to_string(),
            });
        };
        let body = request.body.as_ref().map(Value::to_string);
        let (status, body) = state.api(
            request.method.as_str(),
            request.path.as_str(),
            body.as_deref(),
            user.as_str(),
        );
        Ok(ApiResponse { status, body })
    }
}

impl RouteProbe for FakePlatform {
    fn get(&self, host: &str, path: &str, _timeout: Duration) -> HarnessResult<ProbeResponse> {
        let mut state = self.lock();
        let domain = state.domain.clone();
        let truncate = state.behaviour.truncate_payloads_at;
        let missing = ProbeResponse {
            status: 404,
            body: format!("404 Not Found: Requested route ('{host}') does not exist.\n"),
        };
        let Some(app) = state
            .apps
            .values_mut()
            .find(|a| format!("{}.{domain}", a.name.to_ascii_lowercase()) == host)
        else {
            return Ok(missing);
        };
        let RouteState::Up { env } = app.observe() else {
            return Ok(missing);
        };

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let response = match segments.as_slice() {
            [""] => ProbeResponse {
                status: 200,
                body: String::from("Hi, I'm Dora!"),
            },
            ["env", key] => ProbeResponse {
                status: 200,
                body: env.get(*key).cloned().unwrap_or_default(),
            },
            ["largetext", kb] => {
                let mut body = "1".repeat(kb.parse::<usize>().unwrap_or(0) * 1024);
                if let Some(limit) = truncate {
                    body.truncate(limit);
                }
                ProbeResponse { status: 200, body }
            }
            _ => ProbeResponse {
                status: 404,
                body: String::from("not found"),
            },
        };
        Ok(response)
    }
}
