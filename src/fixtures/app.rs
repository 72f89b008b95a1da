use std::path::PathBuf;

use serde::Serialize;

use crate::error::{CapturedOutput, HarnessError, HarnessResult};
use crate::fixtures::{matching_filename, SourceTree, VirtualFile};

pub const FILLER_FILE: &str = "some-file";
pub const NODE_PROCFILE_COMMAND: &str = "node app.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Pushed,
    Started,
    Stopped,
    Deleted,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pushed => "pushed",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Deleted => "deleted",
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use LifecycleState::{Deleted, Pushed, Started, Stopped};

        matches!(
            (self, next),
            (Pushed, Started)
                | (Pushed, Stopped)
                | (Pushed, Deleted)
                | (Started, Stopped)
                | (Started, Deleted)
                | (Stopped, Started)
                | (Stopped, Deleted)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSource {
    Tree(SourceTree),
    Directory(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPush {
    pub name: String,
    pub source: AppSource,
    pub buildpack: Option<String>,
    pub start_command: Option<String>,
}

impl AppPush {
    pub fn new(name: impl Into<String>, source: AppSource) -> Self {
        Self {
            name: name.into(),
            source,
            buildpack: None,
            start_command: None,
        }
    }

    pub fn with_buildpack(mut self, buildpack: impl Into<String>) -> Self {
        self.buildpack = Some(buildpack.into());
        self
    }

    pub fn with_start_command(mut self, command: impl Into<String>) -> Self {
        self.start_command = Some(command.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    pub path: PathBuf,
    pub memory_limit: String,
    pub domain: String,
    pub buildpack: Option<String>,
    pub start_command: Option<String>,
    pub state: LifecycleState,
}

impl Application {
    pub fn transition(&mut self, next: LifecycleState) -> HarnessResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(HarnessError::ScenarioAssertion {
                message: format!(
                    "app '{}' cannot move from {} to {}",
                    self.name,
                    self.state.as_str(),
                    next.as_str()
                ),
                output: CapturedOutput::default(),
            });
        }
        self.state = next;
        Ok(())
    }
}

pub fn application_files(matching: bool, app_name: &str) -> SourceTree {
    let tree = SourceTree::new().with_file(VirtualFile::empty(FILLER_FILE));
    if matching {
        tree.with_file(VirtualFile::empty(matching_filename(app_name)))
    } else {
        tree
    }
}

pub fn node_with_procfile() -> SourceTree {
    SourceTree::new()
        .with_file(VirtualFile::text(
            "package.json",
            "{\n  \"name\": \"node-with-procfile\",\n  \"version\": \"0.0.1\",\n  \"engines\": {\n    \"node\": \">=0.10\"\n  }\n}\n",
        ))
        .with_file(VirtualFile::text(
            "app.js",
            "var http = require('http');\n\nhttp.createServer(function (req, res) {\n  res.writeHead(200, {'Content-Type': 'text/plain'});\n  res.end('Hello from a node app with a Procfile\\n');\n}).listen(process.env.PORT || 8080);\n",
        ))
        .with_file(VirtualFile::text(
            "Procfile",
            format!("web: {NODE_PROCFILE_COMMAND}\n"),
        ))
}
