pub mod cleanup;
pub mod report;

use std::any::Any;
use std::collections::BTreeMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::resources::{AppEntity, Resource};
use crate::api::transport::{CliCurlTransport, HttpApiTransport};
use crate::api::{ApiClient, ApiRequest, SharedApiTransport};
use crate::command::cli::{CfCli, CfCommand};
use crate::command::{
    CommandExecutor, CommandJournal, CommandRecord, CommandResult, SharedCommandRunner,
    StdCommandRunner,
};
use crate::config::{ApiTransportKind, HarnessConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::app::{AppPush, Application, LifecycleState};
use crate::fixtures::buildpack::{Buildpack, BuildpackSpec};
use crate::fixtures::manager::FixtureManager;
use crate::identity::{Identity, IdentityStack, SessionEnv, SessionRegistry};
use crate::poll::{poll_until, PollPolicy};
use crate::probe::{HttpRouteProbe, ProbeResponse, SharedRouteProbe};
use crate::scenario::cleanup::{CleanupStack, TeardownReport};
use crate::scenario::report::{AppDiagnostics, ScenarioReport, ScenarioStatus};

#[derive(Clone)]
pub struct ScenarioFactory {
    config: Arc<HarnessConfig>,
    runner: SharedCommandRunner,
    api_transport: SharedApiTransport,
    probe: SharedRouteProbe,
}

impl ScenarioFactory {
    pub fn new(
        config: Arc<HarnessConfig>,
        runner: SharedCommandRunner,
        api_transport: SharedApiTransport,
        probe: SharedRouteProbe,
    ) -> Self {
        Self {
            config,
            runner,
            api_transport,
            probe,
        }
    }

    pub fn from_config(config: HarnessConfig) -> HarnessResult<Self> {
        let api_transport: SharedApiTransport = match config.api_transport {
            ApiTransportKind::Cli => Arc::new(CliCurlTransport),
            ApiTransportKind::Http => Arc::new(HttpApiTransport::new(
                config.api_url().as_str(),
                config.skip_ssl_validation,
            )?),
        };
        let probe = Arc::new(HttpRouteProbe::new(
            config.use_http,
            config.skip_ssl_validation,
        )?);
        Ok(Self::new(
            Arc::new(config),
            Arc::new(StdCommandRunner::default()),
            api_transport,
            probe,
        ))
    }

    pub fn config(&self) -> &HarnessConfig {
        self.config.as_ref()
    }

    pub fn scenario(&self, name: &str) -> HarnessResult<Scenario> {
        let slug: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let workdir = self
            .config
            .work_root
            .join(format!("{slug}_{}", Uuid::new_v4()));
        fs::create_dir_all(workdir.as_path())
            .map_err(|source| HarnessError::fixture_io(workdir.as_path(), source))?;

        let executor = CommandExecutor::new(
            Arc::clone(&self.runner),
            CfCli::new(self.config.cli_binary.as_str()),
        );
        let api = ApiClient::new(Arc::clone(&self.api_transport), executor.clone());
        let fixtures = FixtureManager::new(
            executor.clone(),
            api.clone(),
            Arc::clone(&self.config),
            workdir.join("fixtures"),
        );

        Ok(Scenario {
            name: name.to_string(),
            config: Arc::clone(&self.config),
            identities: IdentityStack::new(Identity::user(self.config.as_ref())),
            sessions: SessionRegistry::new(workdir.join("homes")),
            workdir,
            executor,
            api,
            probe: Arc::clone(&self.probe),
            fixtures,
            cleanup: CleanupStack::new(),
            applications: BTreeMap::new(),
            started_at: Utc::now(),
            finished: false,
        })
    }

    pub fn run<F>(&self, name: &str, body: F) -> ScenarioOutcome
    where
        F: FnOnce(&mut Scenario) -> HarnessResult<()>,
    {
        match self.scenario(name) {
            Ok(scenario) => scenario.run(body),
            Err(error) => ScenarioOutcome::not_started(name, error),
        }
    }
}

pub struct Scenario {
    name: String,
    config: Arc<HarnessConfig>,
    workdir: PathBuf,
    executor: CommandExecutor,
    api: ApiClient,
    probe: SharedRouteProbe,
    fixtures: FixtureManager,
    identities: IdentityStack,
    sessions: SessionRegistry,
    cleanup: CleanupStack,
    applications: BTreeMap<String, Application>,
    started_at: DateTime<Utc>,
    finished: bool,
}

impl Scenario {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn config(&self) -> &HarnessConfig {
        self.config.as_ref()
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.as_path()
    }

    pub fn journal(&self) -> &CommandJournal {
        self.executor.journal()
    }

    pub fn cleanup(&self) -> &CleanupStack {
        &self.cleanup
    }

    pub fn active_identity(&self) -> Identity {
        self.identities.active()
    }

    pub fn application(&self, name: &str) -> Option<&Application> {
        self.applications.get(name)
    }

    pub fn with_identity<T, F>(&mut self, identity: Identity, block: F) -> HarnessResult<T>
    where
        F: FnOnce(&mut Self) -> HarnessResult<T>,
    {
        let _guard = self.identities.elevate(identity);
        block(self)
    }

    pub fn as_admin<T, F>(&mut self, block: F) -> HarnessResult<T>
    where
        F: FnOnce(&mut Self) -> HarnessResult<T>,
    {
        let admin = Identity::admin(self.config.as_ref());
        self.with_identity(admin, block)
    }

    pub fn session(&mut self) -> HarnessResult<SessionEnv> {
        let identity = self.identities.active();
        self.sessions
            .session(&identity, &self.executor, self.config.as_ref())
    }

    pub fn cf(&mut self, command: &CfCommand, timeout: Duration) -> HarnessResult<CommandResult> {
        let session = self.session()?;
        self.executor.cf(&session, command, timeout)
    }

    pub fn create_buildpack(&mut self, spec: &BuildpackSpec) -> HarnessResult<Buildpack> {
        self.as_admin(|s| {
            let session = s.session()?;
            s.fixtures.create_buildpack(&session, &mut s.cleanup, spec)
        })
    }

    pub fn set_buildpack_enabled(&mut self, name: &str, enabled: bool) -> HarnessResult<()> {
        self.as_admin(|s| {
            let session = s.session()?;
            let timeout = s.config.default_timeout();
            let buildpack = s.api.buildpack(&session, name, timeout)?;
            s.api
                .set_buildpack_enabled(&session, buildpack.metadata.guid.as_str(), enabled, timeout)?;
            Ok(())
        })
    }

    pub fn disable_buildpack(&mut self, name: &str) -> HarnessResult<()> {
        self.set_buildpack_enabled(name, false)
    }

    pub fn delete_buildpack(&mut self, name: &str) -> HarnessResult<CommandResult> {
        self.as_admin(|s| {
            let session = s.session()?;
            s.fixtures.delete_buildpack(&session, &mut s.cleanup, name)
        })
    }

    pub fn push_app(&mut self, push: &AppPush) -> HarnessResult<Application> {
        let session = self.session()?;
        let app = self
            .fixtures
            .push_application(&session, &mut self.cleanup, push)?;
        self.applications.insert(app.name.clone(), app.clone());
        Ok(app)
    }

    pub fn start_app(&mut self, name: &str) -> HarnessResult<CommandResult> {
        let timeout = self.config.cf_push_timeout();
        let result = self.cf(
            &CfCommand::Start {
                app: name.to_string(),
            },
            timeout,
        )?;
        if result.success() {
            self.mark_app(name, LifecycleState::Started, &result)?;
        }
        Ok(result)
    }

    pub fn stop_app(&mut self, name: &str) -> HarnessResult<CommandResult> {
        let timeout = self.config.default_timeout();
        let result = self.cf(
            &CfCommand::Stop {
                app: name.to_string(),
            },
            timeout,
        )?;
        if result.success() {
            self.mark_app(name, LifecycleState::Stopped, &result)?;
        }
        Ok(result)
    }

    fn mark_app(
        &mut self,
        name: &str,
        next: LifecycleState,
        result: &CommandResult,
    ) -> HarnessResult<()> {
        match self.applications.get_mut(name) {
            Some(app) if app.state != next => app.transition(next).map_err(|err| match err {
                HarnessError::ScenarioAssertion { message, .. } => {
                    HarnessError::ScenarioAssertion {
                        message,
                        output: result.captured(),
                    }
                }
                other => other,
            }),
            _ => Ok(()),
        }
    }

    pub fn delete_app(&mut self, name: &str) -> HarnessResult<CommandResult> {
        let session = self.session()?;
        let result = self
            .fixtures
            .delete_application(&session, &mut self.cleanup, name)?;
        if let Some(mut app) = self.applications.remove(name) {
            app.transition(LifecycleState::Deleted)?;
        }
        Ok(result)
    }

    pub fn app_guid(&mut self, name: &str) -> HarnessResult<String> {
        let session = self.session()?;
        self.fixtures.app_guid(&session, name)
    }

    pub fn app_resource(&mut self, name: &str) -> HarnessResult<Resource<AppEntity>> {
        let session = self.session()?;
        self.api.app(&session, name, self.config.default_timeout())
    }

    pub fn set_app_command(&mut self, name: &str, command: &str) -> HarnessResult<()> {
        let guid = self.app_guid(name)?;
        let session = self.session()?;
        self.api.set_app_command(
            &session,
            guid.as_str(),
            command,
            self.config.default_timeout(),
        )?;
        if let Some(app) = self.applications.get_mut(name) {
            app.start_command = Some(command.to_string());
        }
        Ok(())
    }

    pub fn api_request(&mut self, request: &ApiRequest) -> HarnessResult<Value> {
        let session = self.session()?;
        self.api.request(&session, request)
    }

    pub fn curl_app_within(
        &self,
        name: &str,
        path: &str,
        timeout: Duration,
    ) -> HarnessResult<ProbeResponse> {
        self.probe
            .get(self.config.app_host(name).as_str(), path, timeout)
    }

    pub fn curl_app(&self, name: &str, path: &str) -> HarnessResult<String> {
        self.curl_app_within(name, path, self.config.default_timeout())
            .map(|response| response.body)
    }

    pub fn eventually_curl<F>(
        &self,
        name: &str,
        path: &str,
        policy: PollPolicy,
        predicate: F,
    ) -> HarnessResult<String>
    where
        F: FnMut(&String) -> bool,
    {
        let description = format!("GET {path} on {name}");
        poll_until(
            description.as_str(),
            policy,
            || self.curl_app(name, path),
            predicate,
        )
    }

    pub fn run<F>(mut self, body: F) -> ScenarioOutcome
    where
        F: FnOnce(&mut Scenario) -> HarnessResult<()>,
    {
        let clock = Instant::now();
        info!(scenario = %self.name, workdir = %self.workdir.display(), "scenario started");

        let result = match panic::catch_unwind(AssertUnwindSafe(|| body(&mut self))) {
            Ok(result) => result,
            Err(payload) => Err(HarnessError::Panicked(panic_message(payload.as_ref()))),
        };
        if let Err(error) = &result {
            error!(scenario = %self.name, kind = error.kind(), error = %error, "scenario failed");
        }

        let diagnostics = if result.is_err() {
            self.collect_diagnostics()
        } else {
            Vec::new()
        };
        let teardown = self.finish();
        let outcome = ScenarioOutcome {
            name: self.name.clone(),
            result,
            diagnostics,
            teardown,
            journal: self.executor.journal().snapshot(),
            started_at: self.started_at,
            duration: clock.elapsed(),
        };
        info!(
            scenario = %outcome.name,
            passed = outcome.passed(),
            teardown_failures = outcome.teardown.failures.len(),
            duration_ms = outcome.duration.as_millis() as u64,
            "scenario finished"
        );
        outcome
    }

    fn collect_diagnostics(&mut self) -> Vec<AppDiagnostics> {
        let session = match self.session() {
            Ok(session) => session,
            Err(error) => {
                warn!(scenario = %self.name, error = %error, "skipping app report");
                return Vec::new();
            }
        };
        let timeout = self.config.default_timeout();
        let describe = |outcome: HarnessResult<CommandResult>| match outcome {
            Ok(result) => format!("{}{}", result.stdout, result.stderr),
            Err(error) => format!("unavailable: {error}"),
        };
        self.cleanup
            .applications()
            .into_iter()
            .map(|app| AppDiagnostics {
                report: describe(self.executor.cf(
                    &session,
                    &CfCommand::App { app: app.clone() },
                    timeout,
                )),
                recent_logs: describe(self.executor.cf(
                    &session,
                    &CfCommand::RecentLogs { app: app.clone() },
                    timeout,
                )),
                app,
            })
            .collect()
    }

    fn teardown(&mut self) -> TeardownReport {
        let sessions = &mut self.sessions;
        let executor = &self.executor;
        let config = self.config.as_ref();
        let fixtures = &self.fixtures;
        self.cleanup.drain(|entry| {
            let session = sessions
                .session(&entry.identity, executor, config)
                .map_err(|e| HarnessError::Teardown {
                    resource: entry.handle.describe(),
                    message: format!("no session for '{}': {e}", entry.identity.label()),
                })?;
            fixtures.teardown(&session, &entry.handle)
        })
    }

    fn finish(&mut self) -> TeardownReport {
        self.finished = true;
        let report = self.teardown();
        if let Err(error) = fs::remove_dir_all(self.workdir.as_path()) {
            warn!(workdir = %self.workdir.display(), error = %error, "could not remove scenario workdir");
        }
        report
    }
}

impl Drop for Scenario {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let report = self.finish();
        if !report.is_clean() {
            warn!(
                scenario = %self.name,
                failures = report.failures.len(),
                "teardown on drop left resources behind"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}

#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub result: HarnessResult<()>,
    pub diagnostics: Vec<AppDiagnostics>,
    pub teardown: TeardownReport,
    pub journal: Vec<CommandRecord>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl ScenarioOutcome {
    fn not_started(name: &str, error: HarnessError) -> Self {
        Self {
            name: name.to_string(),
            result: Err(error),
            diagnostics: Vec::new(),
            teardown: TeardownReport::default(),
            journal: Vec::new(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }

    pub fn report(&self) -> ScenarioReport {
        let (status, error_kind, error) = match &self.result {
            Ok(()) => (ScenarioStatus::Passed, None, None),
            Err(error) => (
                ScenarioStatus::Failed,
                Some(error.kind().to_string()),
                Some(error.to_string()),
            ),
        };
        ScenarioReport {
            name: self.name.clone(),
            status,
            error_kind,
            error,
            diagnostics: self.diagnostics.clone(),
            teardown: self.teardown.clone(),
            commands: self.journal.clone(),
            started_at: self.started_at,
            duration_ms: self.duration.as_millis() as u64,
        }
    }
}
