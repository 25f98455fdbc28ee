//! League taxonomy flattening
//!
//! Turns the nested group tree into the set of leaf ids offers may belong to.
//! Traversal uses an explicit stack so depth is bounded by heap, not by the
//! call stack, and tracks the ids of the branch groups on the current
//! root-to-node path to reject cycles.

use crate::error::{IngestError, Result};
use offerflow_common::types::Group;
use std::collections::HashSet;

/// Set of league ids that are leaves of the taxonomy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeagueSet(HashSet<u64>);

impl LeagueSet {
    pub fn contains(&self, league_id: u64) -> bool {
        self.0.contains(&league_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u64> for LeagueSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

enum Visit<'a> {
    Enter(&'a Group),
    Leave(u64),
}

/// Collect the ids of all leaves under `root` (or `root` itself if it is a leaf).
///
/// Children are visited in order, depth first. A group with children whose id
/// already appears on its own ancestor path is reported as
/// [`IngestError::TaxonomyCycle`]. Leaves cannot close a cycle, so a leaf may
/// share its id with an enclosing group.
pub fn flatten(root: &Group) -> Result<LeagueSet> {
    let mut leaves = HashSet::new();
    let mut path = HashSet::new();
    let mut stack = vec![Visit::Enter(root)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(group) => {
                if group.is_leaf() {
                    leaves.insert(group.id);
                    continue;
                }

                if !path.insert(group.id) {
                    return Err(IngestError::TaxonomyCycle { group_id: group.id });
                }

                stack.push(Visit::Leave(group.id));
                stack.extend(group.children().iter().rev().map(Visit::Enter));
            },
            Visit::Leave(id) => {
                path.remove(&id);
            },
        }
    }

    Ok(LeagueSet(leaves))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_tree() -> Group {
        Group::branch(
            100,
            "Sports",
            vec![
                Group::branch(
                    10,
                    "Football",
                    vec![
                        Group::branch(11, "England", vec![Group::leaf(1, "Premier League")]),
                        Group::leaf(2, "La Liga"),
                    ],
                ),
                Group::branch(20, "Tennis", vec![Group::leaf(3, "ATP")]),
            ],
        )
    }

    #[test]
    fn test_flatten_collects_leaves_only() {
        let leagues = flatten(&sample_tree()).unwrap();
        let mut ids: Vec<u64> = leagues.iter().collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!leagues.contains(10));
        assert!(!leagues.contains(100));
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let tree = sample_tree();
        assert_eq!(flatten(&tree).unwrap(), flatten(&tree).unwrap());
    }

    #[test]
    fn test_root_without_children_is_its_own_leaf() {
        let leagues = flatten(&Group::leaf(42, "Standalone")).unwrap();
        assert_eq!(leagues.len(), 1);
        assert!(leagues.contains(42));
    }

    #[test]
    fn test_empty_children_count_as_leaf() {
        let tree = Group::branch(1, "Root", vec![Group::branch(5, "Empty", vec![])]);
        assert!(flatten(&tree).unwrap().contains(5));
    }

    #[test]
    fn test_duplicate_leaves_collapse() {
        let tree = Group::branch(
            100,
            "Sports",
            vec![
                Group::branch(10, "A", vec![Group::leaf(1, "Cup")]),
                Group::branch(20, "B", vec![Group::leaf(1, "Cup")]),
            ],
        );
        assert_eq!(flatten(&tree).unwrap().len(), 1);
    }

    #[test]
    fn test_branch_repeated_on_its_own_path_is_a_cycle() {
        let tree = Group::branch(
            100,
            "Sports",
            vec![Group::branch(
                10,
                "Football",
                vec![Group::branch(100, "Sports", vec![Group::leaf(1, "Cup")])],
            )],
        );
        assert!(matches!(
            flatten(&tree),
            Err(IngestError::TaxonomyCycle { group_id: 100 })
        ));
    }

    #[test]
    fn test_leaf_sharing_an_ancestor_id_is_not_a_cycle() {
        let tree = Group::branch(
            1,
            "Sports",
            vec![Group::branch(10, "Football", vec![Group::leaf(1, "Premier League")])],
        );
        let leagues = flatten(&tree).unwrap();
        assert_eq!(leagues.iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let mut node = Group::leaf(0, "bottom");
        for id in 1..5_000u64 {
            node = Group::branch(id, "level", vec![node]);
        }
        let leagues = flatten(&node).unwrap();
        assert_eq!(leagues.iter().collect::<Vec<_>>(), vec![0]);
    }
}
