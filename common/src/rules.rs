//! Routing rule evaluation.
//!
//! The full rule language (spec.md §9) is out of scope. What's shipped is a
//! minimal, genuinely useful evaluator: glob-match a series' tag values
//! against configured patterns, first match wins. Grounded on the teacher's
//! `common::filter::FilterPattern`, which does the same glob-via-`globset`
//! match for include/exclude path filtering.

use std::collections::HashMap;

use globset::Glob;

use crate::series::SeriesUid;
use crate::target::TargetDescriptor;

/// Tag values read from a series' `.tags` sidecar file.
pub type SeriesTags = HashMap<String, String>;

/// Parses a `.tags` sidecar: one `key=value` line per tag. Blank lines and
/// lines without `=` are skipped rather than treated as malformed.
pub fn parse_tags(contents: &str) -> SeriesTags {
    contents
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// A single routing rule: if `tag`'s value on a series matches `pattern`,
/// route it to `target`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub tag: String,
    pub pattern: Glob,
    pub target: TargetDescriptor,
}

pub trait RuleEvaluator: Send + Sync {
    /// Returns every target a series should be routed to. Order is
    /// unspecified beyond what a particular evaluator documents.
    fn evaluate(&self, uid: &SeriesUid, tags: &SeriesTags) -> Vec<TargetDescriptor>;
}

/// First-match-wins glob evaluator over a configured rule list.
#[derive(Debug, Clone, Default)]
pub struct GlobRuleEvaluator {
    rules: Vec<Rule>,
}

impl GlobRuleEvaluator {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

impl RuleEvaluator for GlobRuleEvaluator {
    fn evaluate(&self, uid: &SeriesUid, tags: &SeriesTags) -> Vec<TargetDescriptor> {
        for rule in &self.rules {
            let Some(value) = tags.get(&rule.tag) else {
                continue;
            };
            if rule.pattern.compile_matcher().is_match(value) {
                let mut target = rule.target.clone();
                if target.series_uid.is_none() {
                    target.series_uid = Some(uid.as_str().to_string());
                }
                return vec![target];
            }
        }
        Vec::new()
    }
}
