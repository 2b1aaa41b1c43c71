//! Living documentation.
//!
//! Renders a feature, optionally overlaid with the results of one test run,
//! as a Markdown document.

use crate::models::{Attachment, Feature, Outcome, TestRun};

/// Icon shown next to a scenario or step with the given outcome.
pub fn outcome_icon(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Passed => "✅",
        Outcome::Failed => "❌",
        Outcome::Skipped => "⏭️",
        Outcome::Untested => "⚪️",
    }
}

/// Render a feature as Markdown.
///
/// With a run, the run's scenario snapshot (and its results, notes and
/// attachments) is rendered instead of the feature's templates, and a
/// "last updated" footer is added.
pub fn render_markdown(feature: &Feature, run: Option<&TestRun>) -> String {
    let mut out = String::new();

    out.push_str(&format!("# 🧪 {}\n\n", feature.name));
    if !feature.description.is_empty() {
        out.push_str(&format!("> {}\n\n", feature.description));
    }

    let scenarios = match run {
        Some(run) => &run.scenarios,
        None => &feature.scenarios,
    };

    for (index, scenario) in scenarios.iter().enumerate() {
        out.push_str(&format!("## {} {}\n\n", outcome_icon(scenario.status), scenario.name));

        for step in &scenario.steps {
            out.push_str(&format!(
                "**{}** {} {}\n\n",
                step.keyword.as_str().to_uppercase(),
                step.text,
                outcome_icon(step.result)
            ));
            write_annotations(&mut out, step.note.as_deref(), &step.attachments);
        }
        write_annotations(&mut out, scenario.note.as_deref(), &scenario.attachments);

        if index + 1 < scenarios.len() {
            out.push_str("---\n\n");
        }
    }

    if let Some(run) = run {
        out.push_str(&format!(
            "\n---\n\n*Last updated: {}*\n",
            run.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    out
}

fn write_annotations(out: &mut String, note: Option<&str>, attachments: &[Attachment]) {
    if let Some(note) = note {
        out.push_str(&format!("> Note: {}\n\n", note));
    }
    if attachments.is_empty() {
        return;
    }
    for attachment in attachments {
        out.push_str(&format!("- 📎 {} ({})\n", attachment.name, attachment.kind));
    }
    out.push('\n');
}
