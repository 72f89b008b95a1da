use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::command::assertions::{
    expect_exit, expect_output_contains, expect_output_in_order, output_has_in_order,
};
use crate::command::cli::{CfCommand, PushArgs};
use crate::command::{CommandExecutor, CommandResult};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::app::{AppPush, AppSource, Application, LifecycleState};
use crate::fixtures::archive::write_zip_archive;
use crate::fixtures::buildpack::{Buildpack, BuildpackSpec};
use crate::identity::SessionEnv;
use crate::scenario::cleanup::CleanupStack;

const CREATE_BUILDPACK_MARKERS: [&str; 4] = ["Creating", "OK", "Uploading", "OK"];
const ABSENT_MARKER: &str = "does not exist";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceHandle {
    Buildpack { name: String },
    Application { name: String },
}

impl ResourceHandle {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Buildpack { .. } => "buildpack",
            Self::Application { .. } => "app",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Buildpack { name } | Self::Application { name } => name.as_str(),
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.kind(), self.name())
    }

    pub fn teardown_command(&self) -> CfCommand {
        match self {
            Self::Buildpack { name } => CfCommand::DeleteBuildpack { name: name.clone() },
            Self::Application { name } => CfCommand::Delete { app: name.clone() },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

#[derive(Clone)]
pub struct FixtureManager {
    executor: CommandExecutor,
    api: ApiClient,
    config: Arc<HarnessConfig>,
    workdir: PathBuf,
}

impl FixtureManager {
    pub fn new(
        executor: CommandExecutor,
        api: ApiClient,
        config: Arc<HarnessConfig>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            api,
            config,
            workdir: workdir.into(),
        }
    }

    pub fn create_buildpack(
        &self,
        session: &SessionEnv,
        cleanup: &mut CleanupStack,
        spec: &BuildpackSpec,
    ) -> HarnessResult<Buildpack> {
        let archive_path = self
            .workdir
            .join("buildpacks")
            .join(spec.name.as_str())
            .join("buildpack.zip");
        let archive = write_zip_archive(archive_path.as_path(), spec.files.as_slice())?;
        let handle = ResourceHandle::Buildpack {
            name: spec.name.clone(),
        };

        let command = CfCommand::CreateBuildpack {
            name: spec.name.clone(),
            archive: archive.path.clone(),
            position: spec.position,
        };
        let result = match self
            .executor
            .cf(session, &command, self.config.default_timeout())
        {
            Ok(result) => result,
            Err(error @ HarnessError::CommandTimeout { .. }) => {
                cleanup.push(handle, session.identity().clone());
                return Err(error);
            }
            Err(error) => return Err(error),
        };

        if result.success() || output_has_in_order(&result, &CREATE_BUILDPACK_MARKERS[..2]) {
            cleanup.push(handle, session.identity().clone());
        }
        provisioning_check(&result, format!("create-buildpack {}", spec.name), |r| {
            expect_exit(r, 0)?;
            expect_output_in_order(r, &CREATE_BUILDPACK_MARKERS)
        })?;

        let resource = self
            .api
            .buildpack(session, spec.name.as_str(), self.config.default_timeout())?;
        info!(
            buildpack = %spec.name,
            guid = %resource.metadata.guid,
            position = spec.position,
            "buildpack created"
        );
        Ok(Buildpack {
            name: spec.name.clone(),
            guid: resource.metadata.guid,
            position: resource.entity.position.unwrap_or(spec.position),
            enabled: resource.entity.enabled,
            archive_sha256: archive.sha256,
        })
    }

    pub fn push_application(
        &self,
        session: &SessionEnv,
        cleanup: &mut CleanupStack,
        push: &AppPush,
    ) -> HarnessResult<Application> {
        let path = match &push.source {
            AppSource::Tree(tree) => {
                let dir = self.workdir.join("apps").join(push.name.as_str());
                tree.materialize(dir.as_path())?;
                dir
            }
            AppSource::Directory(dir) => dir.clone(),
        };
        let args = PushArgs {
            app: push.name.clone(),
            memory_limit: self.config.default_memory_limit.clone(),
            path: path.clone(),
            domain: self.config.apps_domain.clone(),
            buildpack: push.buildpack.clone(),
            start_command: push.start_command.clone(),
        };
        let handle = ResourceHandle::Application {
            name: push.name.clone(),
        };

        let result = match self.executor.cf(
            session,
            &CfCommand::Push(args.clone()),
            self.config.default_timeout(),
        ) {
            Ok(result) => result,
            Err(error @ HarnessError::CommandTimeout { .. }) => {
                cleanup.push(handle, session.identity().clone());
                return Err(error);
            }
            Err(error) => return Err(error),
        };
        if result.success() || result.stdout.contains("Creating app") {
            cleanup.push(handle, session.identity().clone());
        }
        provisioning_check(&result, format!("push {}", push.name), |r| expect_exit(r, 0))?;

        if let Some(backend) = self.config.backend {
            let guid = self.app_guid(session, push.name.as_str())?;
            self.api
                .set_app_backend(session, guid.as_str(), backend, self.config.default_timeout())?;
        }
        info!(app = %push.name, buildpack = ?args.buildpack, "app pushed");

        Ok(Application {
            name: args.app,
            path,
            memory_limit: args.memory_limit,
            domain: args.domain,
            buildpack: args.buildpack,
            start_command: args.start_command,
            state: LifecycleState::Pushed,
        })
    }

    pub fn app_guid(&self, session: &SessionEnv, app_name: &str) -> HarnessResult<String> {
        let result = self.executor.cf(
            session,
            &CfCommand::AppGuid {
                app: app_name.to_string(),
            },
            self.config.default_timeout(),
        )?;
        expect_exit(&result, 0)?;
        result
            .last_stdout_line()
            .map(str::to_string)
            .ok_or_else(|| HarnessError::NotFound {
                kind: String::from("app"),
                name: app_name.to_string(),
            })
    }

    pub fn delete_buildpack(
        &self,
        session: &SessionEnv,
        cleanup: &mut CleanupStack,
        name: &str,
    ) -> HarnessResult<CommandResult> {
        let handle = ResourceHandle::Buildpack {
            name: name.to_string(),
        };
        let result = self.executor.cf(
            session,
            &handle.teardown_command(),
            self.config.default_timeout(),
        )?;
        expect_exit(&result, 0)?;
        if result.stdout.contains(ABSENT_MARKER) {
            return Err(HarnessError::NotFound {
                kind: String::from("buildpack"),
                name: name.to_string(),
            });
        }
        cleanup.release(&handle);
        info!(buildpack = name, "buildpack deleted");
        Ok(result)
    }

    pub fn delete_application(
        &self,
        session: &SessionEnv,
        cleanup: &mut CleanupStack,
        name: &str,
    ) -> HarnessResult<CommandResult> {
        let handle = ResourceHandle::Application {
            name: name.to_string(),
        };
        let result = self.executor.cf(
            session,
            &handle.teardown_command(),
            self.config.default_timeout(),
        )?;
        expect_exit(&result, 0)?;
        expect_output_contains(&result, format!("Deleting app {name}").as_str())?;
        if result.stdout.contains(ABSENT_MARKER) {
            return Err(HarnessError::NotFound {
                kind: String::from("app"),
                name: name.to_string(),
            });
        }
        cleanup.release(&handle);
        info!(app = name, "app deleted");
        Ok(result)
    }

    pub fn teardown(
        &self,
        session: &SessionEnv,
        handle: &ResourceHandle,
    ) -> HarnessResult<DeleteOutcome> {
        let teardown_error = |message: String| HarnessError::Teardown {
            resource: handle.describe(),
            message,
        };
        let result = self
            .executor
            .cf(
                session,
                &handle.teardown_command(),
                self.config.teardown_timeout(),
            )
            .map_err(|e| teardown_error(e.to_string()))?;
        if !result.success() {
            return Err(teardown_error(format!(
                "exit code {}: {}",
                result.exit_code,
                result.captured()
            )));
        }
        if result.stdout.contains(ABSENT_MARKER) {
            warn!(resource = %handle.describe(), "resource already absent at teardown");
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        info!(resource = %handle.describe(), "resource torn down");
        Ok(DeleteOutcome::Deleted)
    }
}

fn provisioning_check<F>(result: &CommandResult, step: String, check: F) -> HarnessResult<()>
where
    F: FnOnce(&CommandResult) -> HarnessResult<()>,
{
    check(result).map_err(|error| match error {
        HarnessError::ScenarioAssertion { message, output } => HarnessError::Provisioning {
            message: format!("{step}: {message}"),
            output,
        },
        other => other,
    })
}
