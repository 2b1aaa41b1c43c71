//! Line-oriented Gherkin feature parser.
//!
//! Turns the raw text of a `.feature` file into a [`Feature`] tree. The parser
//! is lenient: malformed or partial input never fails, it just yields a
//! feature with whatever could be recognized (possibly an empty name and no
//! scenarios).
//!
//! Supported syntax:
//! - `Feature:` line, followed by free-text description lines
//! - `Scenario:` lines
//! - `Given`/`When`/`Then`/`And`/`But` step lines inside a scenario
//! - `#` comments and blank lines
//!
//! Everything else inside a scenario (data tables, doc strings, scenario
//! descriptions) is ignored. Tags are never populated.

use crate::fingerprint::fingerprint;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::models::{Feature, Scenario, SourceFile, Step, StepKeyword};
use std::sync::Arc;

/// Feature parser with an injected identity source.
pub struct FeatureParser {
    ids: Arc<dyn IdGenerator>,
}

impl Default for FeatureParser {
    fn default() -> Self {
        Self::new(Arc::new(UuidGenerator))
    }
}

impl FeatureParser {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    /// Parse `content` uploaded as `file_name`.
    ///
    /// Every feature, scenario and step receives a fresh id, so parsing the
    /// same text twice yields two distinct trees.
    pub fn parse(&self, file_name: &str, content: &str) -> Feature {
        let source_file = SourceFile {
            name: file_name.to_string(),
            content: content.to_string(),
            hash: fingerprint(content),
        };
        let mut feature = Feature::new(self.ids.next_id(), source_file);

        let lines: Vec<&str> = content.split('\n').collect();
        let mut current: Option<Scenario> = None;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim();
            i += 1;

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix("Feature:") {
                feature.name = name.trim().to_string();

                // Description runs up to (not including) the first Scenario line
                let mut description = Vec::new();
                while i < lines.len() && !lines[i].trim().starts_with("Scenario") {
                    let desc_line = lines[i].trim();
                    if !desc_line.is_empty() {
                        description.push(desc_line);
                    }
                    i += 1;
                }
                feature.description = description.join(" ");
                continue;
            }

            if let Some(name) = line.strip_prefix("Scenario:") {
                if let Some(done) = current.take() {
                    feature.scenarios.push(done);
                }
                current = Some(Scenario::new(self.ids.next_id(), name.trim().to_string()));
                continue;
            }

            if let Some(scenario) = current.as_mut() {
                if let Some((keyword, text)) = match_step(line) {
                    scenario
                        .steps
                        .push(Step::new(self.ids.next_id(), keyword, text.to_string()));
                }
            }
        }

        if let Some(done) = current {
            feature.scenarios.push(done);
        }

        feature
    }
}

/// Parse a feature file with random identities.
pub fn parse_feature(file_name: &str, content: &str) -> Feature {
    FeatureParser::default().parse(file_name, content)
}

/// Match a trimmed line against the step keywords, in declaration order.
///
/// The keyword must be followed by a space; the text is the trimmed rest.
fn match_step(line: &str) -> Option<(StepKeyword, &str)> {
    StepKeyword::all().iter().find_map(|keyword| {
        line.strip_prefix(keyword.as_str())
            .and_then(|rest| rest.strip_prefix(' '))
            .map(|text| (*keyword, text.trim()))
    })
}
