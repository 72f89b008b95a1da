use crate::command::assertions::{expect_exit, expect_output_contains, expect_output_lacks};
use crate::error::HarnessResult;
use crate::fixtures::app::{application_files, AppPush, AppSource};
use crate::fixtures::buildpack::{BuildpackSpec, STAGING_MARKER};
use crate::fixtures::{prefixed_random_name, random_name};
use crate::scenario::Scenario;

pub const NO_APP_DETECTED: &str = "NoAppDetectedError";

struct Setup {
    buildpack: String,
    app: String,
    push: AppPush,
}

fn setup(s: &mut Scenario, matching: bool) -> HarnessResult<Setup> {
    let buildpack = random_name();
    let app = prefixed_random_name("CATS-APP-");
    s.create_buildpack(&BuildpackSpec::simple_for_app(buildpack.clone(), app.as_str())?)?;
    let push = AppPush::new(
        app.clone(),
        AppSource::Tree(application_files(matching, app.as_str())),
    );
    Ok(Setup {
        buildpack,
        app,
        push,
    })
}

fn expect_not_detected(s: &mut Scenario, app: &str) -> HarnessResult<()> {
    let start = s.start_app(app)?;
    expect_exit(&start, 1)?;
    expect_output_contains(&start, NO_APP_DETECTED)
}

pub fn detected_buildpack_is_used(s: &mut Scenario) -> HarnessResult<()> {
    let setup = setup(s, true)?;
    s.push_app(&setup.push)?;

    let start = s.start_app(setup.app.as_str())?;
    expect_exit(&start, 0)?;
    expect_output_contains(&start, STAGING_MARKER)?;
    expect_output_lacks(&start, NO_APP_DETECTED)?;

    s.delete_app(setup.app.as_str())?;
    s.delete_buildpack(setup.buildpack.as_str())?;
    Ok(())
}

pub fn empty_app_is_not_detected(s: &mut Scenario) -> HarnessResult<()> {
    let setup = setup(s, false)?;
    s.push_app(&setup.push)?;
    expect_not_detected(s, setup.app.as_str())?;

    s.delete_app(setup.app.as_str())?;
    s.delete_buildpack(setup.buildpack.as_str())?;
    Ok(())
}

pub fn disabled_buildpack_is_not_detected(s: &mut Scenario) -> HarnessResult<()> {
    let setup = setup(s, true)?;
    s.disable_buildpack(setup.buildpack.as_str())?;
    s.push_app(&setup.push)?;
    expect_not_detected(s, setup.app.as_str())?;

    s.delete_app(setup.app.as_str())?;
    s.delete_buildpack(setup.buildpack.as_str())?;
    Ok(())
}

pub fn deleted_buildpack_is_not_detected(s: &mut Scenario) -> HarnessResult<()> {
    let setup = setup(s, true)?;
    s.delete_buildpack(setup.buildpack.as_str())?;
    s.push_app(&setup.push)?;
    expect_not_detected(s, setup.app.as_str())?;

    s.delete_app(setup.app.as_str())?;
    Ok(())
}
