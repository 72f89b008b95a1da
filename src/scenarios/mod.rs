pub mod admin_buildpacks;
pub mod large_payload;
pub mod start_command;

use std::fmt;

use chrono::Utc;
use tracing::info;

use crate::error::{HarnessError, HarnessResult};
use crate::scenario::report::RunReport;
use crate::scenario::{Scenario, ScenarioFactory};

pub type ScenarioBody = fn(&mut Scenario) -> HarnessResult<()>;

#[derive(Clone, Copy)]
pub struct ScenarioDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub body: ScenarioBody,
}

impl fmt::Debug for ScenarioDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

pub fn catalog() -> Vec<ScenarioDefinition> {
    vec![
        ScenarioDefinition {
            name: "admin_buildpacks/detected",
            description: "an app matching a custom buildpack stages with it",
            body: admin_buildpacks::detected_buildpack_is_used,
        },
        ScenarioDefinition {
            name: "admin_buildpacks/empty_app",
            description: "an app without the marker file is rejected by the buildpack",
            body: admin_buildpacks::empty_app_is_not_detected,
        },
        ScenarioDefinition {
            name: "admin_buildpacks/disabled",
            description: "a disabled buildpack takes no part in detection",
            body: admin_buildpacks::disabled_buildpack_is_not_detected,
        },
        ScenarioDefinition {
            name: "admin_buildpacks/deleted",
            description: "a deleted buildpack takes no part in detection",
            body: admin_buildpacks::deleted_buildpack_is_not_detected,
        },
        ScenarioDefinition {
            name: "start_command/command_flag",
            description: "a changed start command applies after stop and start",
            body: start_command::command_flag_takes_effect_after_restart,
        },
        ScenarioDefinition {
            name: "start_command/procfile",
            description: "the web process of a Procfile becomes the detected start command",
            body: start_command::procfile_web_process_is_detected,
        },
        ScenarioDefinition {
            name: "large_payload/largetext",
            description: "a 5 KiB response body reaches the client intact",
            body: large_payload::large_response_body_is_delivered,
        },
    ]
}

pub fn select(only: &[String]) -> HarnessResult<Vec<ScenarioDefinition>> {
    let all = catalog();
    if only.is_empty() {
        return Ok(all);
    }
    only.iter()
        .map(|wanted| {
            all.iter()
                .find(|def| def.name == wanted.as_str())
                .copied()
                .ok_or_else(|| HarnessError::NotFound {
                    kind: String::from("scenario"),
                    name: wanted.clone(),
                })
        })
        .collect()
}

pub fn run_catalog(factory: &ScenarioFactory, definitions: &[ScenarioDefinition]) -> RunReport {
    let started_at = Utc::now();
    let reports = definitions
        .iter()
        .map(|def| {
            info!(scenario = def.name, description = def.description, "running scenario");
            factory.run(def.name, def.body).report()
        })
        .collect();
    RunReport::new(started_at, reports)
}
