//! Run reporting: history, version comparison and status filtering.

use crate::models::{Environment, Outcome, Project, RunStatus, RunSummary, Scenario, TestRun};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Maximum number of runs returned by [`run_history`].
pub const HISTORY_LIMIT: usize = 10;

/// Completed runs of a feature, newest first.
///
/// Only the newest run per (environment, version) is kept, and at most
/// [`HISTORY_LIMIT`] runs are returned.
pub fn run_history<'a>(
    project: &'a Project,
    feature_id: &str,
    environment: Option<Environment>,
) -> Vec<&'a TestRun> {
    let mut latest: HashMap<(Environment, &str), &TestRun> = HashMap::new();

    for run in project.runs.iter().filter(|r| r.feature_id == feature_id) {
        if run.status != RunStatus::Completed {
            continue;
        }
        if environment.is_some_and(|e| e != run.environment) {
            continue;
        }
        let key = (run.environment, run.version.as_str());
        match latest.get(&key) {
            Some(existing) if existing.created_at >= run.created_at => {}
            _ => {
                latest.insert(key, run);
            }
        }
    }

    let mut runs: Vec<&TestRun> = latest.into_values().collect();
    runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    runs.truncate(HISTORY_LIMIT);
    runs
}

/// How a scenario's status moved between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    /// failed to passed
    Improved,
    /// passed to failed
    Regressed,
    /// untested to anything else
    NewlyTested,
    /// anything to untested
    UntestedNow,
    Changed,
}

impl Change {
    /// Classify a status transition. `None` means no change.
    pub fn classify(before: Outcome, after: Outcome) -> Option<Self> {
        if before == after {
            return None;
        }
        Some(match (before, after) {
            (Outcome::Failed, Outcome::Passed) => Change::Improved,
            (Outcome::Passed, Outcome::Failed) => Change::Regressed,
            (Outcome::Untested, _) => Change::NewlyTested,
            (_, Outcome::Untested) => Change::UntestedNow,
            _ => Change::Changed,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Change::Improved => "↗️ Improved",
            Change::Regressed => "↘️ Regressed",
            Change::NewlyTested => "🆕 Newly Tested",
            Change::UntestedNow => "🔄 Untested Now",
            Change::Changed => "🔄 Changed",
        }
    }
}

/// One scenario in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub scenario_id: String,
    pub name: String,
    pub before: Outcome,
    pub after: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Change>,
}

/// Scenario-by-scenario comparison of two runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub before_run: String,
    pub before_version: String,
    pub before_summary: RunSummary,
    pub after_run: String,
    pub after_version: String,
    pub after_summary: RunSummary,
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    /// Rows whose status changed.
    pub fn changed(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.rows.iter().filter(|r| r.change.is_some())
    }
}

/// Compare two runs scenario by scenario.
///
/// Rows follow the scenarios of `before`; a scenario missing from `after`
/// counts as untested there.
pub fn compare_runs(before: &TestRun, after: &TestRun) -> Comparison {
    let rows = before
        .scenarios
        .iter()
        .map(|scenario| {
            let after_status = after
                .find_scenario(&scenario.id)
                .map(|s| s.status)
                .unwrap_or_default();
            ComparisonRow {
                scenario_id: scenario.id.clone(),
                name: scenario.name.clone(),
                before: scenario.status,
                after: after_status,
                change: Change::classify(scenario.status, after_status),
            }
        })
        .collect();

    Comparison {
        before_run: before.id.clone(),
        before_version: before.version.clone(),
        before_summary: before.summary,
        after_run: after.id.clone(),
        after_version: after.version.clone(),
        after_summary: after.summary,
        rows,
    }
}

/// Compare the newest completed runs of two versions in one environment.
pub fn compare_versions(
    project: &Project,
    feature_id: &str,
    environment: Environment,
    before_version: &str,
    after_version: &str,
) -> Result<Comparison> {
    if project.find_feature(feature_id).is_none() {
        return Err(Error::NotFound(format!("Feature not found: {}", feature_id)));
    }

    let find = |version: &str| {
        project
            .runs_for_feature(feature_id)
            .filter(|r| {
                r.environment == environment
                    && r.status == RunStatus::Completed
                    && r.version == version
            })
            .max_by_key(|r| r.created_at)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No completed run for version {} in {}",
                    version, environment
                ))
            })
    };

    let before = find(before_version)?;
    let after = find(after_version)?;
    Ok(compare_runs(before, after))
}

/// Scenarios of a run, optionally only those with the given status.
pub fn filter_scenarios(run: &TestRun, status: Option<Outcome>) -> Vec<&Scenario> {
    run.scenarios
        .iter()
        .filter(|s| status.is_none_or(|wanted| s.status == wanted))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::parser::FeatureParser;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    const CONTENT: &str = "Feature: Search
Scenario: By name
Given a catalog
Scenario: By tag
Given a catalog
Scenario: Empty query
Given a catalog";

    fn project() -> Project {
        let feature = FeatureParser::new(Arc::new(SequentialIds::new("s"))).parse("s.feature", CONTENT);
        let mut project = Project::new("p".to_string(), "P".to_string());
        project.features.push(feature);
        project
    }

    fn completed_run(
        project: &mut Project,
        id: &str,
        environment: Environment,
        version: &str,
        age_minutes: i64,
        results: &[Outcome],
    ) {
        let feature = &project.features[0];
        let mut run = TestRun::snapshot(feature, environment, version, id.to_string());
        run.created_at = Utc::now() - Duration::minutes(age_minutes);
        for (scenario, result) in feature.scenarios.iter().zip(results) {
            run.set_scenario_result(&scenario.id, *result).unwrap();
        }
        run.complete();
        project.runs.push(run);
    }

    #[test]
    fn test_change_classification() {
        use Outcome::*;
        assert_eq!(Change::classify(Passed, Passed), None);
        assert_eq!(Change::classify(Failed, Passed), Some(Change::Improved));
        assert_eq!(Change::classify(Passed, Failed), Some(Change::Regressed));
        assert_eq!(Change::classify(Untested, Failed), Some(Change::NewlyTested));
        assert_eq!(Change::classify(Skipped, Untested), Some(Change::UntestedNow));
        assert_eq!(Change::classify(Skipped, Passed), Some(Change::Changed));
        assert_eq!(Change::classify(Failed, Skipped), Some(Change::Changed));
    }

    #[test]
    fn test_history_keeps_latest_per_version() {
        let mut project = project();
        use Outcome::*;
        completed_run(&mut project, "old-v1", Environment::Staging, "v1", 30, &[Failed]);
        completed_run(&mut project, "new-v1", Environment::Staging, "v1", 20, &[Passed]);
        completed_run(&mut project, "v2", Environment::Staging, "v2", 10, &[Passed]);
        completed_run(&mut project, "prod-v1", Environment::Production, "v1", 5, &[Passed]);

        // In-progress runs never appear
        let feature = project.features[0].clone();
        project
            .runs
            .push(TestRun::snapshot(&feature, Environment::Staging, "v3", "open".to_string()));

        let ids: Vec<&str> = run_history(&project, &feature.id, None)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["prod-v1", "v2", "new-v1"]);

        let staging: Vec<&str> = run_history(&project, &feature.id, Some(Environment::Staging))
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(staging, vec!["v2", "new-v1"]);
    }

    #[test]
    fn test_history_limit() {
        let mut project = project();
        for i in 0..15 {
            completed_run(
                &mut project,
                &format!("r{}", i),
                Environment::Uat,
                &format!("v{}", i),
                i,
                &[],
            );
        }
        let feature_id = project.features[0].id.clone();
        let history = run_history(&project, &feature_id, None);
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].id, "r0");
    }

    #[test]
    fn test_compare_versions() {
        let mut project = project();
        use Outcome::*;
        completed_run(&mut project, "a", Environment::Staging, "v1", 20, &[Failed, Passed, Untested]);
        completed_run(&mut project, "b", Environment::Staging, "v2", 10, &[Passed, Failed, Skipped]);
        let feature_id = project.features[0].id.clone();

        let comparison =
            compare_versions(&project, &feature_id, Environment::Staging, "v1", "v2").unwrap();
        assert_eq!(comparison.before_run, "a");
        assert_eq!(comparison.after_run, "b");
        let changes: Vec<Option<Change>> = comparison.rows.iter().map(|r| r.change).collect();
        assert_eq!(
            changes,
            vec![
                Some(Change::Improved),
                Some(Change::Regressed),
                Some(Change::NewlyTested)
            ]
        );
        assert_eq!(comparison.changed().count(), 3);
        assert_eq!(comparison.after_summary.failed, 1);

        assert!(matches!(
            compare_versions(&project, &feature_id, Environment::Production, "v1", "v2"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            compare_versions(&project, "nope", Environment::Staging, "v1", "v2"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_compare_missing_scenario_counts_as_untested() {
        let project = project();
        let feature = &project.features[0];
        let mut before = TestRun::snapshot(feature, Environment::Staging, "v1", "a".to_string());
        let scenario_id = before.scenarios[2].id.clone();
        before.set_scenario_result(&scenario_id, Outcome::Passed).unwrap();

        let mut after = TestRun::snapshot(feature, Environment::Staging, "v2", "b".to_string());
        after.scenarios.truncate(2);

        let comparison = compare_runs(&before, &after);
        assert_eq!(comparison.rows[2].after, Outcome::Untested);
        assert_eq!(comparison.rows[2].change, Some(Change::UntestedNow));
        assert_eq!(comparison.rows[0].change, None);
    }

    #[test]
    fn test_filter_scenarios() {
        let project = project();
        let mut run =
            TestRun::snapshot(&project.features[0], Environment::Uat, "v1", "r".to_string());
        let first = run.scenarios[0].id.clone();
        run.set_scenario_result(&first, Outcome::Failed).unwrap();

        assert_eq!(filter_scenarios(&run, None).len(), 3);
        let failed = filter_scenarios(&run, Some(Outcome::Failed));
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, first);
        assert_eq!(filter_scenarios(&run, Some(Outcome::Untested)).len(), 2);
    }
}
