pub mod app;
pub mod archive;
pub mod buildpack;
pub mod manager;

use std::fs;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::error::{HarnessError, HarnessResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    pub path: String,
    pub body: String,
    pub executable: bool,
}

impl VirtualFile {
    pub fn text(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
            executable: false,
        }
    }

    pub fn script(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
            executable: true,
        }
    }

    pub fn empty(path: impl Into<String>) -> Self {
        Self::text(path, String::new())
    }

    fn relative_path(&self) -> HarnessResult<PathBuf> {
        let path = Path::new(self.path.as_str());
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if self.path.is_empty() || escapes {
            return Err(HarnessError::fixture_io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "fixture paths must stay inside the fixture root",
                ),
            ));
        }
        Ok(path.to_path_buf())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTree {
    files: Vec<VirtualFile>,
}

impl SourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: VirtualFile) -> Self {
        self.files.retain(|existing| existing.path != file.path);
        self.files.push(file);
        self
    }

    pub fn files(&self) -> &[VirtualFile] {
        self.files.as_slice()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    pub fn materialize(&self, dir: &Path) -> HarnessResult<()> {
        fs::create_dir_all(dir).map_err(|source| HarnessError::fixture_io(dir, source))?;
        for file in &self.files {
            let target = dir.join(file.relative_path()?);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|source| HarnessError::fixture_io(parent, source))?;
            }
            fs::write(target.as_path(), file.body.as_bytes())
                .map_err(|source| HarnessError::fixture_io(target.as_path(), source))?;
            if file.executable {
                mark_executable(target.as_path())?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> HarnessResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|source| HarnessError::fixture_io(path, source))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> HarnessResult<()> {
    Ok(())
}

pub fn random_name() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(16);
    token
}

pub fn prefixed_random_name(prefix: &str) -> String {
    format!("{prefix}{}", random_name())
}

pub fn matching_filename(app_name: &str) -> String {
    format!("simple-buildpack-please-match-{app_name}")
}
