use std::path::PathBuf;

use crate::command::assertions::expect_exit;
use crate::config::ConfigError;
use crate::error::{CapturedOutput, HarnessError, HarnessResult};
use crate::fixtures::app::{node_with_procfile, AppPush, AppSource, NODE_PROCFILE_COMMAND};
use crate::fixtures::prefixed_random_name;
use crate::scenario::Scenario;

pub const FOO_COMMAND: &str = "FOO=foo bundle exec rackup config.ru -p $PORT";
pub const BAR_COMMAND: &str = "FOO=bar bundle exec rackup config.ru -p $PORT";

pub(crate) fn dora_asset(s: &Scenario) -> HarnessResult<PathBuf> {
    s.config().dora_asset.clone().ok_or_else(|| {
        HarnessError::Config(ConfigError::MissingField {
            field: String::from("assets.dora"),
        })
    })
}

pub fn command_flag_takes_effect_after_restart(s: &mut Scenario) -> HarnessResult<()> {
    let app = prefixed_random_name("CATS-APP-");
    let push = AppPush::new(app.clone(), AppSource::Directory(dora_asset(s)?))
        .with_buildpack(s.config().ruby_buildpack_name.clone())
        .with_start_command(FOO_COMMAND);
    s.push_app(&push)?;
    expect_exit(&s.start_app(app.as_str())?, 0)?;

    let startup = s.config().slow_poll();
    let policy = s.config().fast_poll();
    s.eventually_curl(app.as_str(), "/env/FOO", startup, |body| body.contains("foo"))?;

    s.set_app_command(app.as_str(), BAR_COMMAND)?;
    expect_exit(&s.stop_app(app.as_str())?, 0)?;
    s.eventually_curl(app.as_str(), "/env/FOO", policy, |body| body.contains("404"))?;

    expect_exit(&s.start_app(app.as_str())?, 0)?;
    s.eventually_curl(app.as_str(), "/env/FOO", startup, |body| body.contains("bar"))?;
    Ok(())
}

pub fn procfile_web_process_is_detected(s: &mut Scenario) -> HarnessResult<()> {
    let app = prefixed_random_name("CATS-APP-");
    let push = AppPush::new(app.clone(), AppSource::Tree(node_with_procfile()))
        .with_buildpack(s.config().nodejs_buildpack_name.clone());
    s.push_app(&push)?;
    expect_exit(&s.start_app(app.as_str())?, 0)?;

    let resource = s.app_resource(app.as_str())?;
    let detected = resource.entity.detected_start_command.unwrap_or_default();
    if detected != NODE_PROCFILE_COMMAND {
        return Err(HarnessError::ScenarioAssertion {
            message: format!(
                "expected detected start command '{NODE_PROCFILE_COMMAND}', got '{detected}'"
            ),
            output: CapturedOutput::default(),
        });
    }
    Ok(())
}
