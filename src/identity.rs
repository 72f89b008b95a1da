use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::command::assertions::expect_exit;
use crate::command::cli::CfCommand;
use crate::command::CommandExecutor;
use crate::config::{Credentials, HarnessConfig};
use crate::error::{HarnessError, HarnessResult};

pub const ADMIN_LABEL: &str = "admin";
pub const USER_LABEL: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    label: String,
    credentials: Credentials,
}

impl Identity {
    pub fn new(label: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            label: label.into(),
            credentials,
        }
    }

    pub fn admin(config: &HarnessConfig) -> Self {
        Self::new(ADMIN_LABEL, config.admin.clone())
    }

    pub fn user(config: &HarnessConfig) -> Self {
        Self::new(USER_LABEL, config.user.clone())
    }

    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnv {
    identity: Identity,
    home: PathBuf,
}

impl SessionEnv {
    pub fn new(identity: Identity, home: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            home: home.into(),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn home(&self) -> &Path {
        self.home.as_path()
    }
}

#[derive(Debug, Clone)]
pub struct IdentityStack {
    base: Identity,
    frames: Rc<RefCell<Vec<Identity>>>,
}

impl IdentityStack {
    pub fn new(base: Identity) -> Self {
        Self {
            base,
            frames: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn active(&self) -> Identity {
        self.frames
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| self.base.clone())
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len() + 1
    }

    pub fn elevate(&self, identity: Identity) -> ElevationGuard {
        let mut frames = self.frames.borrow_mut();
        let restore_depth = frames.len();
        debug!(
            from = frames.last().unwrap_or(&self.base).label(),
            to = identity.label(),
            depth = restore_depth + 2,
            "switching identity"
        );
        frames.push(identity);
        ElevationGuard {
            frames: Rc::clone(&self.frames),
            restore_depth,
        }
    }
}

#[must_use = "the identity is restored as soon as the guard is dropped"]
pub struct ElevationGuard {
    frames: Rc<RefCell<Vec<Identity>>>,
    restore_depth: usize,
}

impl Drop for ElevationGuard {
    fn drop(&mut self) {
        let mut frames = self.frames.borrow_mut();
        frames.truncate(self.restore_depth);
        debug!(
            restored = frames.last().map(Identity::label).unwrap_or("base"),
            depth = frames.len() + 1,
            "restored identity"
        );
    }
}

#[derive(Debug)]
pub struct SessionRegistry {
    root: PathBuf,
    sessions: HashMap<String, SessionEnv>,
}

impl SessionRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sessions: HashMap::new(),
        }
    }

    pub fn is_acquired(&self, identity: &Identity) -> bool {
        self.sessions.contains_key(identity.label())
    }

    pub fn session(
        &mut self,
        identity: &Identity,
        executor: &CommandExecutor,
        config: &HarnessConfig,
    ) -> HarnessResult<SessionEnv> {
        if let Some(existing) = self.sessions.get(identity.label()) {
            if existing.identity() == identity {
                return Ok(existing.clone());
            }
        }

        let home = self.root.join(identity.label());
        fs::create_dir_all(home.as_path())
            .map_err(|source| HarnessError::fixture_io(home.clone(), source))?;
        let session = SessionEnv::new(identity.clone(), home);
        acquire(&session, executor, config)?;
        info!(identity = identity.label(), username = %identity.credentials().username, "session acquired");
        self.sessions
            .insert(identity.label().to_string(), session.clone());
        Ok(session)
    }
}

fn acquire(
    session: &SessionEnv,
    executor: &CommandExecutor,
    config: &HarnessConfig,
) -> HarnessResult<()> {
    let credentials = session.identity().credentials();
    let mut steps = vec![
        CfCommand::Api {
            endpoint: config.api_url(),
            skip_ssl_validation: config.skip_ssl_validation,
        },
        CfCommand::Auth {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        },
    ];
    if let (Some(org), Some(space)) = (credentials.org.as_ref(), credentials.space.as_ref()) {
        steps.push(CfCommand::Target {
            org: org.clone(),
            space: space.clone(),
        });
    }

    for step in steps {
        let result = executor.cf(session, &step, config.default_timeout())?;
        expect_exit(&result, 0).map_err(|_| HarnessError::Provisioning {
            message: format!(
                "could not acquire session for '{}' ({} failed)",
                session.identity().label(),
                step.name()
            ),
            output: result.captured(),
        })?;
    }
    Ok(())
}
