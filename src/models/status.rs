//! Status derivation for scenarios and runs.
//!
//! Pure functions; callers keep `Scenario::status` in sync via
//! [`scenario_status`] before asking for a [`run_summary`].

use super::{Outcome, RunSummary, Scenario};

/// Derive a scenario's status from its step results.
///
/// Precedence, first match wins:
/// 1. any step failed -> `Failed`
/// 2. any step untested -> `Untested`
/// 3. passed with no skips -> `Passed`
/// 4. skipped with no passes -> `Skipped`
/// 5. passed and skipped mixed -> `Passed`
/// 6. otherwise (no steps) -> `Untested`
pub fn scenario_status(scenario: &Scenario) -> Outcome {
    let has = |outcome: Outcome| scenario.steps.iter().any(|s| s.result == outcome);

    let failed = has(Outcome::Failed);
    let untested = has(Outcome::Untested);
    let passed = has(Outcome::Passed);
    let skipped = has(Outcome::Skipped);

    match (failed, untested, passed, skipped) {
        (true, _, _, _) => Outcome::Failed,
        (false, true, _, _) => Outcome::Untested,
        (false, false, true, false) => Outcome::Passed,
        (false, false, false, true) => Outcome::Skipped,
        (false, false, true, true) => Outcome::Passed,
        (false, false, false, false) => Outcome::Untested,
    }
}

/// Count scenarios by their stored status.
pub fn run_summary(scenarios: &[Scenario]) -> RunSummary {
    let mut summary = RunSummary {
        total: scenarios.len(),
        ..RunSummary::default()
    };
    for scenario in scenarios {
        match scenario.status {
            Outcome::Passed => summary.passed += 1,
            Outcome::Failed => summary.failed += 1,
            Outcome::Skipped => summary.skipped += 1,
            Outcome::Untested => summary.untested += 1,
        }
    }
    summary
}
