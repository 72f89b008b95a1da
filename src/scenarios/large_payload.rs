use std::time::Duration;

use crate::command::assertions::expect_exit;
use crate::error::HarnessResult;
use crate::fixtures::app::{AppPush, AppSource};
use crate::fixtures::prefixed_random_name;
use crate::poll::poll_until;
use crate::scenario::Scenario;
use crate::scenarios::start_command::dora_asset;

pub const PAYLOAD_KB: usize = 5;

pub fn large_response_body_is_delivered(s: &mut Scenario) -> HarnessResult<()> {
    let app = prefixed_random_name("CATS-APPS-");
    let push = AppPush::new(app.clone(), AppSource::Directory(dora_asset(s)?))
        .with_buildpack(s.config().ruby_buildpack_name.clone());
    s.push_app(&push)?;
    expect_exit(&s.start_app(app.as_str())?, 0)?;

    let path = format!("/largetext/{PAYLOAD_KB}");
    let policy = s
        .config()
        .fast_poll()
        .with_timeout(s.config().scaled(Duration::from_secs(10)))
        .with_interval(Duration::from_secs(10));
    let request_timeout = s.config().long_curl_timeout();
    let expected = PAYLOAD_KB * 1024;
    poll_until(
        format!("{path} body is {expected} bytes").as_str(),
        policy,
        || {
            s.curl_app_within(app.as_str(), path.as_str(), request_timeout)
                .map(|response| response.body.len())
        },
        |len| *len == expected,
    )?;
    Ok(())
}
