use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::{matching_filename, VirtualFile};

pub const STAGING_MARKER: &str = "Staging with Simple Buildpack";
pub const RESPONSE_TEXT: &str = "hi from a simple admin buildpack";
pub const DEFAULT_POSITION: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    pub config_vars: BTreeMap<String, String>,
    pub default_process_types: BTreeMap<String, String>,
}

pub fn simple_release() -> ReleaseDescriptor {
    let mut config_vars = BTreeMap::new();
    config_vars.insert(
        String::from("PATH"),
        String::from("bin:/usr/local/bin:/usr/bin:/bin"),
    );
    config_vars.insert(String::from("FROM_BUILD_PACK"), String::from("yes"));

    let mut default_process_types = BTreeMap::new();
    default_process_types.insert(
        String::from("web"),
        format!(
            "while true; do {{ echo -e 'HTTP/1.1 200 OK\\r\\n'; echo \"{RESPONSE_TEXT}\"; }} | nc -l $PORT; done"
        ),
    );

    ReleaseDescriptor {
        config_vars,
        default_process_types,
    }
}

pub fn detect_script(marker_file: &str) -> String {
    format!(
        "#!/bin/bash\n\nif [ -f \"${{1}}/{marker_file}\" ]; then\n  echo Simple\nelse\n  echo no\n  exit 1\nfi\n"
    )
}

pub fn compile_script() -> String {
    // Log streaming attaches late, so the marker is printed after a pause.
    format!("#!/usr/bin/env bash\n\nsleep 5\n\necho \"{STAGING_MARKER}\"\n\nsleep 10\n")
}

pub fn release_script(release: &ReleaseDescriptor) -> HarnessResult<String> {
    let yaml = serde_yaml::to_string(release).map_err(|e| HarnessError::Provisioning {
        message: format!("could not render buildpack release descriptor: {e}"),
        output: Default::default(),
    })?;
    Ok(format!(
        "#!/usr/bin/env bash\n\ncat <<'EOF'\n---\n{yaml}EOF\n"
    ))
}

pub fn simple_buildpack_files(marker_file: &str) -> HarnessResult<Vec<VirtualFile>> {
    Ok(vec![
        VirtualFile::script("bin/compile", compile_script()),
        VirtualFile::script("bin/detect", detect_script(marker_file)),
        VirtualFile::script("bin/release", release_script(&simple_release())?),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildpackSpec {
    pub name: String,
    pub files: Vec<VirtualFile>,
    pub position: u32,
}

impl BuildpackSpec {
    pub fn new(name: impl Into<String>, files: Vec<VirtualFile>) -> Self {
        Self {
            name: name.into(),
            files,
            position: DEFAULT_POSITION,
        }
    }

    pub fn simple_for_app(name: impl Into<String>, app_name: &str) -> HarnessResult<Self> {
        Ok(Self::new(
            name,
            simple_buildpack_files(matching_filename(app_name).as_str())?,
        ))
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buildpack {
    pub name: String,
    pub guid: String,
    pub position: u32,
    pub enabled: bool,
    pub archive_sha256: String,
}
