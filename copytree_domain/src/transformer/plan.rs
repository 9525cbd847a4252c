// /////////////////////////////////////////////////////////////////////////////
// CopyTree
// Copyright (c) 2026 A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Pure plan validation and optimization over transformer traits (§4.4).
//! These functions take plain descriptors rather than trait objects so
//! they can be exercised without constructing real transformers — the
//! registry (`copytree::infrastructure::transformers::registry`) is the
//! only caller that owns live `Arc<dyn Transformer>` instances.

use super::traits::TransformerTraits;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct TransformerDescriptor {
    pub name: String,
    pub traits: TransformerTraits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanIssueKind {
    Conflict,
    Ordering,
    IncompatibleTypes,
    MissingResource,
    Redundancy,
    Performance,
    CircularDependency,
}

#[derive(Debug, Clone)]
pub struct PlanIssue {
    pub kind: PlanIssueKind,
    pub message: String,
}

impl PlanIssue {
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind, PlanIssueKind::Redundancy | PlanIssueKind::Performance)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvironmentCapabilities {
    pub has_api_key: bool,
    pub has_network: bool,
    pub memory_class: Option<String>,
}

/// Validates an ordered plan (a list of transformer names) against the
/// registered descriptors, reporting every issue kind named in §4.4.
pub fn validate_plan(
    plan: &[String],
    registry: &HashMap<String, TransformerDescriptor>,
    env: &EnvironmentCapabilities,
) -> Vec<PlanIssue> {
    let mut issues = Vec::new();

    let resolved: Vec<&TransformerDescriptor> = plan.iter().filter_map(|n| registry.get(n)).collect();

    // conflict: any pair (A, B) with B in A.conflicts_with
    for (i, a) in resolved.iter().enumerate() {
        for b in resolved.iter().skip(i + 1) {
            if a.traits.conflicts_with.iter().any(|c| c == &b.name) || b.traits.conflicts_with.iter().any(|c| c == &a.name) {
                issues.push(PlanIssue {
                    kind: PlanIssueKind::Conflict,
                    message: format!("'{}' conflicts with '{}'", a.name, b.name),
                });
            }
        }
    }

    // ordering: a non-idempotent transformer placed after an order-sensitive
    // one downstream of it; an order-sensitive transformer not first among
    // type-compatible peers.
    for (i, entry) in resolved.iter().enumerate() {
        if entry.traits.order_sensitive {
            for earlier in resolved.iter().take(i) {
                if earlier.traits.outputs_compatible_with(&entry.traits) {
                    issues.push(PlanIssue {
                        kind: PlanIssueKind::Ordering,
                        message: format!(
                            "order-sensitive transformer '{}' is not first among type-compatible peers (preceded by '{}')",
                            entry.name, earlier.name
                        ),
                    });
                }
            }
        }
        if !entry.traits.idempotent {
            for later in resolved.iter().skip(i + 1) {
                if later.traits.order_sensitive {
                    issues.push(PlanIssue {
                        kind: PlanIssueKind::Ordering,
                        message: format!(
                            "non-idempotent transformer '{}' runs before order-sensitive '{}'",
                            entry.name, later.name
                        ),
                    });
                }
            }
        }
    }

    // incompatible_types: adjacent stages whose declared types don't line up
    for pair in resolved.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if !a.traits.outputs_compatible_with(&b.traits) {
            issues.push(PlanIssue {
                kind: PlanIssueKind::IncompatibleTypes,
                message: format!("'{}' output types are incompatible with '{}' input types", a.name, b.name),
            });
        }
    }

    // missing_resource
    for entry in &resolved {
        let req = &entry.traits.requirements;
        if req.api_key && !env.has_api_key {
            issues.push(PlanIssue {
                kind: PlanIssueKind::MissingResource,
                message: format!("'{}' requires an API key that is not configured", entry.name),
            });
        }
        if req.network && !env.has_network {
            issues.push(PlanIssue {
                kind: PlanIssueKind::MissingResource,
                message: format!("'{}' requires network access that is unavailable", entry.name),
            });
        }
        if let Some(required_class) = &req.memory_class {
            if env.memory_class.as_deref() != Some(required_class.as_str()) {
                issues.push(PlanIssue {
                    kind: PlanIssueKind::MissingResource,
                    message: format!("'{}' requires memory class '{required_class}'", entry.name),
                });
            }
        }
    }

    // redundancy: two transformers sharing a single-apply tag (e.g. "summary")
    const SINGLE_APPLY_TAGS: &[&str] = &["summary"];
    for tag in SINGLE_APPLY_TAGS {
        let sharing: Vec<&str> = resolved
            .iter()
            .filter(|e| e.traits.tags.iter().any(|t| t == tag))
            .map(|e| e.name.as_str())
            .collect();
        if sharing.len() > 1 {
            issues.push(PlanIssue {
                kind: PlanIssueKind::Redundancy,
                message: format!("multiple transformers share single-apply tag '{tag}': {}", sharing.join(", ")),
            });
        }
    }

    // performance: more than three heavy transformers
    let heavy_count = resolved.iter().filter(|e| e.traits.heavy).count();
    if heavy_count > 3 {
        issues.push(PlanIssue {
            kind: PlanIssueKind::Performance,
            message: format!("plan contains {heavy_count} heavy transformers (budget is 3)"),
        });
    }

    // circular dependency across the full registered set (not just the plan)
    if let Some(cycle) = detect_cycle(registry) {
        issues.push(PlanIssue {
            kind: PlanIssueKind::CircularDependency,
            message: format!("circular transformer dependency: {}", cycle.join(" -> ")),
        });
    }

    issues
}

/// Iterative DFS with white/gray/black coloring (design note §9) over the
/// transitive `dependencies` graph. Returns the cycle's member names, in
/// order, if one exists.
pub fn detect_cycle(registry: &HashMap<String, TransformerDescriptor>) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: HashMap<&str, Color> = registry.keys().map(|k| (k.as_str(), Color::White)).collect();
    let mut path: Vec<&str> = Vec::new();

    for start in registry.keys() {
        if color.get(start.as_str()) != Some(&Color::White) {
            continue;
        }
        // Explicit stack of (node, next-dependency-index) to avoid recursion.
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        color.insert(start.as_str(), Color::Gray);
        path.push(start.as_str());

        while let Some((node, idx)) = stack.last().copied() {
            let deps = registry.get(node).map(|d| d.traits.dependencies.as_slice()).unwrap_or(&[]);
            if idx >= deps.len() {
                color.insert(node, Color::Black);
                path.pop();
                stack.pop();
                continue;
            }
            stack.last_mut().unwrap().1 += 1;
            let next = deps[idx].as_str();
            match color.get(next) {
                Some(Color::White) | None => {
                    if registry.contains_key(next) {
                        color.insert(next, Color::Gray);
                        path.push(next);
                        stack.push((next, 0));
                    }
                }
                Some(Color::Gray) => {
                    let cycle_start = path.iter().position(|n| *n == next).unwrap_or(0);
                    let mut cycle: Vec<String> = path[cycle_start..].iter().map(|s| s.to_string()).collect();
                    cycle.push(next.to_string());
                    return Some(cycle);
                }
                Some(Color::Black) => {}
            }
        }
    }
    None
}

/// Produces a topologically-valid permutation preferring, in order:
/// order-sensitive first, light before heavy, idempotent later. Returns
/// the reordered plan plus human-readable reasons for any change made.
pub fn optimize_plan(plan: &[String], registry: &HashMap<String, TransformerDescriptor>) -> (Vec<String>, Vec<String>) {
    let mut entries: Vec<&TransformerDescriptor> = plan.iter().filter_map(|n| registry.get(n)).collect();
    let original: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();

    entries.sort_by(|a, b| {
        b.traits
            .order_sensitive
            .cmp(&a.traits.order_sensitive)
            .then(a.traits.heavy.cmp(&b.traits.heavy))
            .then(a.traits.idempotent.cmp(&b.traits.idempotent))
    });

    let reordered: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
    let mut reasons = Vec::new();
    if reordered != original {
        reasons.push("reordered: order-sensitive first, light before heavy, idempotent last".to_string());
    }
    (reordered, reasons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::traits::ContentType;

    fn descriptor(name: &str, traits: TransformerTraits) -> TransformerDescriptor {
        TransformerDescriptor { name: name.to_string(), traits }
    }

    #[test]
    fn conflict_detected() {
        let mut registry = HashMap::new();
        registry.insert(
            "a".to_string(),
            descriptor(
                "a",
                TransformerTraits {
                    conflicts_with: vec!["b".to_string()],
                    ..Default::default()
                },
            ),
        );
        registry.insert("b".to_string(), descriptor("b", TransformerTraits::default()));

        let issues = validate_plan(&["a".to_string(), "b".to_string()], &registry, &EnvironmentCapabilities::default());
        assert!(issues.iter().any(|i| i.kind == PlanIssueKind::Conflict));
    }

    #[test]
    fn ordering_issue_for_non_idempotent_before_order_sensitive() {
        let mut registry = HashMap::new();
        registry.insert(
            "non_idempotent".to_string(),
            descriptor(
                "non_idempotent",
                TransformerTraits {
                    idempotent: false,
                    ..Default::default()
                },
            ),
        );
        registry.insert(
            "order_sensitive".to_string(),
            descriptor(
                "order_sensitive",
                TransformerTraits {
                    order_sensitive: true,
                    ..Default::default()
                },
            ),
        );
        let issues = validate_plan(
            &["non_idempotent".to_string(), "order_sensitive".to_string()],
            &registry,
            &EnvironmentCapabilities::default(),
        );
        assert!(issues.iter().any(|i| i.kind == PlanIssueKind::Ordering));
    }

    #[test]
    fn cycle_detected() {
        let mut registry = HashMap::new();
        registry.insert(
            "a".to_string(),
            descriptor(
                "a",
                TransformerTraits {
                    dependencies: vec!["b".to_string()],
                    ..Default::default()
                },
            ),
        );
        registry.insert(
            "b".to_string(),
            descriptor(
                "b",
                TransformerTraits {
                    dependencies: vec!["a".to_string()],
                    ..Default::default()
                },
            ),
        );
        assert!(detect_cycle(&registry).is_some());
    }

    #[test]
    fn heavy_plan_triggers_performance_warning() {
        let mut registry = HashMap::new();
        for name in ["h1", "h2", "h3", "h4"] {
            registry.insert(
                name.to_string(),
                descriptor(
                    name,
                    TransformerTraits {
                        heavy: true,
                        ..Default::default()
                    },
                ),
            );
        }
        let plan: Vec<String> = ["h1", "h2", "h3", "h4"].iter().map(|s| s.to_string()).collect();
        let issues = validate_plan(&plan, &registry, &EnvironmentCapabilities::default());
        assert!(issues.iter().any(|i| i.kind == PlanIssueKind::Performance));
    }

    #[test]
    fn incompatible_types_flagged() {
        let mut registry = HashMap::new();
        registry.insert(
            "pdf".to_string(),
            descriptor(
                "pdf",
                TransformerTraits {
                    input_types: vec![ContentType::Binary],
                    output_types: vec![ContentType::Text],
                    ..Default::default()
                },
            ),
        );
        registry.insert(
            "ocr".to_string(),
            descriptor(
                "ocr",
                TransformerTraits {
                    input_types: vec![ContentType::Image],
                    output_types: vec![ContentType::Text],
                    ..Default::default()
                },
            ),
        );
        let issues = validate_plan(&["pdf".to_string(), "ocr".to_string()], &registry, &EnvironmentCapabilities::default());
        assert!(issues.iter().any(|i| i.kind == PlanIssueKind::IncompatibleTypes));
    }
}
