// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `RulesetFilter` — an ordered bundle of include rule-sets, global
//! exclude rules, and always-rules producing one boolean verdict per file.
//!
//! `accept` evaluates, in order: (1) always-rules → immediate accept;
//! (2) include-sets → must match at least one (no include rules means
//! accept all); (3) global excludes → reject; (4) negations within the
//! last-matched set override. Ties break on longer anchored patterns, then
//! later source lines within the same set.

use super::pattern::Rule;

#[derive(Debug, Clone, Default)]
pub struct RulesetFilter {
    pub always: Vec<Rule>,
    pub include_sets: Vec<Vec<Rule>>,
    pub exclude: Vec<Rule>,
}

impl RulesetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates this filter's verdict for `relative_path`.
    pub fn accept(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.always.iter().any(|r| r.matches(relative_path, is_dir)) {
            return true;
        }

        if !self.include_sets.is_empty() {
            let included = self
                .include_sets
                .iter()
                .any(|set| last_match_verdict(set, relative_path, is_dir).unwrap_or(false));
            if !included {
                return false;
            }
        }

        match last_match_verdict(&self.exclude, relative_path, is_dir) {
            Some(true) => false,
            Some(false) => true,
            None => true,
        }
    }
}

/// Resolves the verdict for one rule-set: the highest-specificity matching
/// rule wins; among equal specificity, the later source line wins. A
/// negated winning rule means "re-include" (verdict `false` == not
/// excluded / not required), matching how the caller interprets it for
/// both include-sets (verdict true == matched) and excludes (verdict true
/// == excluded).
fn last_match_verdict(rules: &[Rule], relative_path: &str, is_dir: bool) -> Option<bool> {
    let mut best: Option<&Rule> = None;
    for rule in rules {
        if !rule.matches(relative_path, is_dir) {
            continue;
        }
        best = match best {
            None => Some(rule),
            Some(current) => {
                if rule.specificity() > current.specificity()
                    || (rule.specificity() == current.specificity() && rule.line >= current.line)
                {
                    Some(rule)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.map(|rule| !rule.negate)
}

/// One directory's ignore-file contents, scoped to that directory and its
/// descendants, with the directory's depth (number of path segments from
/// the walk root) recorded so rules can be evaluated deepest-first.
#[derive(Debug, Clone)]
pub struct IgnoreLayer {
    pub depth: usize,
    pub rules: Vec<Rule>,
}

/// A stack of per-directory ignore-file layers accumulated while walking
/// down a tree. Evaluated deepest-first: the first matching rule (closest
/// to the file) wins, and `!pattern` re-includes.
#[derive(Debug, Clone, Default)]
pub struct LayeredIgnore {
    layers: Vec<IgnoreLayer>,
}

impl LayeredIgnore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_layer(&mut self, depth: usize, rules: Vec<Rule>) {
        self.layers.push(IgnoreLayer { depth, rules });
    }

    /// `true` if `relative_path` (relative to the root the layers were
    /// collected under) is ignored by the deepest matching layer.
    pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        let mut layers: Vec<&IgnoreLayer> = self.layers.iter().collect();
        layers.sort_by(|a, b| b.depth.cmp(&a.depth));
        for layer in layers {
            if let Some(verdict) = last_match_verdict(&layer.rules, relative_path, is_dir) {
                return verdict;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(p: &str, line: usize) -> Rule {
        Rule::compile(p, "test", line, false).unwrap()
    }

    #[test]
    fn always_rule_overrides_exclude() {
        let mut f = RulesetFilter::new();
        f.exclude.push(rule("*.md", 1));
        f.always.push(rule("README.md", 1));
        assert!(f.accept("README.md", false));
        assert!(!f.accept("OTHER.md", false));
    }

    #[test]
    fn no_include_rules_means_accept_all() {
        let f = RulesetFilter::new();
        assert!(f.accept("anything.rs", false));
    }

    #[test]
    fn include_set_requires_a_match() {
        let mut f = RulesetFilter::new();
        f.include_sets.push(vec![rule("**/*.md", 1)]);
        assert!(f.accept("README.md", false));
        assert!(!f.accept("index.js", false));
    }

    #[test]
    fn negation_within_exclude_set_overrides() {
        let mut f = RulesetFilter::new();
        f.exclude.push(rule("*.log", 1));
        f.exclude.push(rule("!important.log", 2));
        assert!(!f.accept("debug.log", false));
        assert!(f.accept("important.log", false));
    }

    #[test]
    fn layered_ignore_is_deepest_first() {
        let mut layered = LayeredIgnore::new();
        layered.push_layer(0, vec![rule("*.log", 1)]);
        layered.push_layer(1, vec![rule("!keep.log", 1)]);
        assert!(!layered.is_ignored("sub/keep.log", false));
        assert!(layered.is_ignored("other.log", false));
    }
}
