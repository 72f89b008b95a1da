use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::command::CommandRecord;
use crate::error::{HarnessError, HarnessResult};
use crate::scenario::cleanup::TeardownReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppDiagnostics {
    pub app: String,
    pub report: String,
    pub recent_logs: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub status: ScenarioStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<AppDiagnostics>,
    pub teardown: TeardownReport,
    pub commands: Vec<CommandRecord>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passed: usize,
    pub failed: usize,
    pub teardown_failures: usize,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, scenarios: Vec<ScenarioReport>) -> Self {
        let passed = scenarios
            .iter()
            .filter(|s| s.status == ScenarioStatus::Passed)
            .count();
        let teardown_failures = scenarios.iter().map(|s| s.teardown.failures.len()).sum();
        Self {
            started_at,
            finished_at: Utc::now(),
            passed,
            failed: scenarios.len() - passed,
            teardown_failures,
            scenarios,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub fn write_run_report(path: &Path, report: &RunReport) -> HarnessResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| HarnessError::fixture_io(parent, source))?;
    }
    let mut bytes = serde_json::to_vec_pretty(report).map_err(|source| HarnessError::Serialize {
        context: String::from("run report"),
        source,
    })?;
    bytes.push(b'\n');
    fs::write(path, bytes).map_err(|source| HarnessError::fixture_io(path, source))
}
