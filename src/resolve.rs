//! Modifier ordering and conflict resolution
//!
//! Builds a dependency graph over a recipe's modifiers and produces a
//! deterministic execution order:
//!
//! - Two modifiers whose target sets intersect get an edge from the one
//!   whose interval ends first to the one that starts later.
//! - Intersecting targets with *overlapping* intervals have no resolvable
//!   precedence and are a fatal conflict. An open-ended interval overlaps
//!   everything at or after its start, so two open-ended modifiers on the
//!   same target always conflict.
//! - `Modifier::requires` kinds add edges regardless of targets (e.g.
//!   quantization after pruning).
//!
//! Ties are broken by declaration order, so disjoint-target modifiers
//! keep the order the recipe wrote them in and the result is identical
//! across runs.

use crate::modifier::{Modifier, Target};
use std::collections::BTreeSet;
use thiserror::Error;

/// Ordering/conflict errors. Raised at load, before any modifier runs.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Two modifiers mutate the same target over overlapping intervals
    #[error("modifiers '{a}' and '{b}' both act on {target} over overlapping intervals")]
    ConflictingModifiers {
        a: String,
        b: String,
        target: Target,
    },

    /// Declared dependencies form a cycle
    #[error("modifier dependencies form a cycle involving '{0}'")]
    DependencyCycle(String),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Compute the execution order for a set of labeled modifiers.
///
/// Returns indices into `entries` in execution order. The order is total
/// and deterministic: topological over the dependency edges, with ready
/// ties resolved by declaration index.
pub fn execution_order(entries: &[(&str, &dyn Modifier)]) -> Result<Vec<usize>> {
    let n = entries.len();
    let targets: Vec<Vec<Target>> = entries.iter().map(|(_, m)| m.targets()).collect();

    // edges[a] contains b  <=>  a must run before b
    let mut edges: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            let Some(shared) = first_shared_target(&targets[i], &targets[j]) else {
                continue;
            };
            let (a, _) = entries[i];
            let (b, _) = entries[j];
            let iv_i = entries[i].1.interval();
            let iv_j = entries[j].1.interval();
            if iv_i.precedes(&iv_j) {
                edges[i].insert(j);
            } else if iv_j.precedes(&iv_i) {
                edges[j].insert(i);
            } else {
                return Err(ResolveError::ConflictingModifiers {
                    a: a.to_string(),
                    b: b.to_string(),
                    target: shared.clone(),
                });
            }
        }
    }

    for (j, (_, modifier)) in entries.iter().enumerate() {
        for kind in modifier.requires() {
            for (i, (_, other)) in entries.iter().enumerate() {
                if i != j && other.kind() == kind {
                    edges[i].insert(j);
                }
            }
        }
    }

    kahn(entries, &edges)
}

fn first_shared_target<'a>(a: &'a [Target], b: &[Target]) -> Option<&'a Target> {
    a.iter().find(|t| b.contains(t))
}

fn kahn(entries: &[(&str, &dyn Modifier)], edges: &[BTreeSet<usize>]) -> Result<Vec<usize>> {
    let n = edges.len();
    let mut in_degree = vec![0usize; n];
    for successors in edges {
        for &b in successors {
            in_degree[b] += 1;
        }
    }

    // BTreeSet as the ready queue: the smallest declaration index among
    // the currently-unblocked modifiers always runs next.
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(next);
        for &b in &edges[next] {
            in_degree[b] -= 1;
            if in_degree[b] == 0 {
                ready.insert(b);
            }
        }
    }

    if order.len() < n {
        let stuck = (0..n)
            .find(|&i| in_degree[i] > 0)
            .map(|i| entries[i].0.to_string())
            .unwrap_or_default();
        return Err(ResolveError::DependencyCycle(stuck));
    }
    Ok(order)
}
