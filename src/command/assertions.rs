use crate::command::CommandResult;
use crate::error::{HarnessError, HarnessResult};

pub fn expect_exit(result: &CommandResult, code: i32) -> HarnessResult<()> {
    if result.exit_code == code {
        return Ok(());
    }
    Err(HarnessError::ScenarioAssertion {
        message: format!("expected exit code {code}, got {}", result.exit_code),
        output: result.captured(),
    })
}

pub fn expect_output_contains(result: &CommandResult, needle: &str) -> HarnessResult<()> {
    if result.stdout.contains(needle) {
        return Ok(());
    }
    Err(HarnessError::ScenarioAssertion {
        message: format!("expected output to contain '{needle}'"),
        output: result.captured(),
    })
}

pub fn expect_output_lacks(result: &CommandResult, needle: &str) -> HarnessResult<()> {
    if !result.stdout.contains(needle) {
        return Ok(());
    }
    Err(HarnessError::ScenarioAssertion {
        message: format!("expected output not to contain '{needle}'"),
        output: result.captured(),
    })
}

// Each marker must appear after the end of the previous one, so repeated
// markers such as "OK" are matched as distinct occurrences.
pub fn expect_output_in_order(result: &CommandResult, markers: &[&str]) -> HarnessResult<()> {
    let mut cursor = 0usize;
    for marker in markers {
        match result.stdout[cursor..].find(marker) {
            Some(offset) => cursor += offset + marker.len(),
            None => {
                return Err(HarnessError::ScenarioAssertion {
                    message: format!(
                        "expected output to contain [{}] in order; '{marker}' missing after byte {cursor}",
                        markers.join(", ")
                    ),
                    output: result.captured(),
                });
            }
        }
    }
    Ok(())
}

pub fn output_has_in_order(result: &CommandResult, markers: &[&str]) -> bool {
    expect_output_in_order(result, markers).is_ok()
}
