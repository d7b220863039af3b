//! Keyword rule matching and tag set diffs.
//!
//! # Invariants
//! - Matching is exact and case-sensitive on dependency names.
//! - Results are deterministic (`BTreeSet`), independent of rule order.

use crate::model::auto_tag::{AutoTagRule, DEFAULT_REQUIRED_PACKAGES};
use crate::model::bookmark::TagId;
use std::collections::BTreeSet;

/// Tag ids of every rule with at least one keyword in `dependency_names`.
pub fn match_rules(dependency_names: &BTreeSet<String>, rules: &[AutoTagRule]) -> BTreeSet<TagId> {
    rules
        .iter()
        .filter(|rule| {
            rule.keywords
                .iter()
                .any(|keyword| dependency_names.contains(keyword))
        })
        .map(|rule| rule.tag_id.clone())
        .collect()
}

/// The user's required packages, or `fallback` when none are configured.
pub fn effective_required_packages(configured: &[String], fallback: &[String]) -> Vec<String> {
    if !configured.is_empty() {
        return configured.to_vec();
    }
    if !fallback.is_empty() {
        return fallback.to_vec();
    }
    DEFAULT_REQUIRED_PACKAGES
        .iter()
        .map(|name| (*name).to_string())
        .collect()
}

/// Whether `dependency_names` holds at least one required package.
pub fn passes_required_gate(dependency_names: &BTreeSet<String>, required: &[String]) -> bool {
    required.iter().any(|name| dependency_names.contains(name))
}

/// Attach/detach sets turning `current` into `desired`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSetDiff<T> {
    pub attach: Vec<T>,
    pub detach: Vec<T>,
}

impl<T> TagSetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.attach.is_empty() && self.detach.is_empty()
    }
}

/// Set difference between the current and desired values, each side
/// deduplicated and sorted.
pub fn tag_set_diff<T: Ord + Clone>(current: &[T], desired: &[T]) -> TagSetDiff<T> {
    let current: BTreeSet<&T> = current.iter().collect();
    let desired: BTreeSet<&T> = desired.iter().collect();
    TagSetDiff {
        attach: desired
            .difference(&current)
            .map(|value| (*value).clone())
            .collect(),
        detach: current
            .difference(&desired)
            .map(|value| (*value).clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{effective_required_packages, match_rules, passes_required_gate, tag_set_diff};
    use crate::model::auto_tag::AutoTagRule;
    use std::collections::BTreeSet;

    fn deps(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn rule(tag_id: &str, keywords: &[&str]) -> AutoTagRule {
        AutoTagRule {
            tag_id: tag_id.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn rule_fires_on_any_keyword() {
        let matched = match_rules(&deps(&["next", "react"]), &[rule("t1", &["next"])]);
        assert_eq!(matched, deps(&["t1"]));
    }

    #[test]
    fn no_overlap_matches_nothing() {
        let matched = match_rules(&deps(&["vue"]), &[rule("t1", &["next"]), rule("t2", &[])]);
        assert!(matched.is_empty());
    }

    #[test]
    fn several_rules_can_fire() {
        let rules = [
            rule("t_ui", &["react", "vue"]),
            rule("t_orm", &["drizzle-orm", "prisma"]),
            rule("t_none", &["svelte"]),
        ];
        let matched = match_rules(&deps(&["react", "prisma", "zod"]), &rules);
        assert_eq!(matched, deps(&["t_orm", "t_ui"]));
    }

    #[test]
    fn required_gate_uses_default_next() {
        let required = effective_required_packages(&[], &[]);
        assert_eq!(required, vec!["next".to_string()]);
        assert!(!passes_required_gate(&deps(&["react"]), &required));
        assert!(passes_required_gate(&deps(&["react", "next"]), &required));
    }

    #[test]
    fn configured_required_packages_win_over_fallback() {
        let required = effective_required_packages(&["nuxt".to_string()], &["next".to_string()]);
        assert_eq!(required, vec!["nuxt".to_string()]);
    }

    #[test]
    fn tag_diff_is_set_difference() {
        let current = ["a", "b", "c"].map(String::from);
        let desired = ["c", "d", "d"].map(String::from);
        let diff = tag_set_diff(&current, &desired);
        assert_eq!(diff.attach, vec!["d".to_string()]);
        assert_eq!(diff.detach, vec!["a".to_string(), "b".to_string()]);
        assert!(tag_set_diff(&desired, &desired).is_empty());
    }
}
