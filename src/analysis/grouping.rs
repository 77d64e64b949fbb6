//! Grouping of similar facts across sources.
//!
//! Similarity is word overlap: two statements are similar when their
//! lowercase word sets share at least `min(3, 0.4 * n)` words, where `n`
//! is the anchor's word count ([`GroupingStrategy::Greedy`]) or the
//! smaller word count of the pair ([`GroupingStrategy::UnionFind`]).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::facts::Fact;

/// How facts are partitioned into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStrategy {
    /// Single pass in input order. Each ungrouped fact anchors a group and
    /// collects every later ungrouped fact similar to it. Depends on order.
    #[default]
    Greedy,
    /// Symmetric similarity with transitive closure. The partition does not
    /// depend on input order.
    UnionFind,
}

/// Facts judged to state the same thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactGroup {
    pub id: usize,
    /// Members in input order; the first is the group's representative.
    pub facts: Vec<Fact>,
}

impl FactGroup {
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn representative(&self) -> Option<&Fact> {
        self.facts.first()
    }

    pub fn mean_confidence(&self) -> f64 {
        if self.facts.is_empty() {
            return 0.0;
        }
        self.facts.iter().map(|f| f.confidence).sum::<f64>() / self.facts.len() as f64
    }
}

fn word_set(statement: &str) -> HashSet<String> {
    statement
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

fn overlaps_enough(a: &HashSet<String>, b: &HashSet<String>, basis: usize) -> bool {
    if basis == 0 {
        return false;
    }
    let shared = a.intersection(b).count() as f64;
    shared >= (0.4 * basis as f64).min(3.0)
}

/// Partition `facts` into groups and tag each fact with its group id.
///
/// The slice keeps its order; only `group_id` is written. Every fact
/// lands in exactly one group. Groups are numbered from 0 in the order of
/// their first member and hold copies of their members.
pub fn group_facts(facts: &mut [Fact], strategy: GroupingStrategy) -> Vec<FactGroup> {
    let words: Vec<HashSet<String>> = facts.iter().map(|f| word_set(&f.statement)).collect();
    let labels = match strategy {
        GroupingStrategy::Greedy => greedy_labels(&words),
        GroupingStrategy::UnionFind => union_find_labels(&words),
    };

    let group_count = labels.iter().max().map_or(0, |m| m + 1);
    let mut groups: Vec<FactGroup> = (0..group_count)
        .map(|id| FactGroup {
            id,
            facts: Vec::new(),
        })
        .collect();
    for (fact, label) in facts.iter_mut().zip(labels) {
        fact.group_id = Some(label);
        groups[label].facts.push(fact.clone());
    }
    groups
}

fn greedy_labels(words: &[HashSet<String>]) -> Vec<usize> {
    let mut labels: Vec<Option<usize>> = vec![None; words.len()];
    let mut next = 0;
    for anchor in 0..words.len() {
        if labels[anchor].is_some() {
            continue;
        }
        labels[anchor] = Some(next);
        for other in anchor + 1..words.len() {
            if labels[other].is_none()
                && overlaps_enough(&words[anchor], &words[other], words[anchor].len())
            {
                labels[other] = Some(next);
            }
        }
        next += 1;
    }
    labels.into_iter().map(|l| l.unwrap_or(0)).collect()
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

fn union_find_labels(words: &[HashSet<String>]) -> Vec<usize> {
    let n = words.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in i + 1..n {
            let basis = words[i].len().min(words[j].len());
            if overlaps_enough(&words[i], &words[j], basis) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    // Keep the lower index as root so ids follow first appearance.
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut root_label: Vec<Option<usize>> = vec![None; n];
    let mut next = 0;
    (0..n)
        .map(|i| {
            let root = find(&mut parent, i);
            *root_label[root].get_or_insert_with(|| {
                let label = next;
                next += 1;
                label
            })
        })
        .collect()
}
