// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Diff engines reconciling registry-side lists against desired lists.

pub mod notifications;
pub mod team;

pub use notifications::{plan_notification_changes, sync_notifications, NotificationOp};
pub use team::{ensure_team_access, sync_team, TeamSyncOutcome};

use std::collections::HashSet;
use std::hash::Hash;

/// Result of comparing two lists by identity
#[derive(Debug, PartialEq, Eq)]
pub struct SetDiff<'a, D, A> {
    pub missing: Vec<&'a D>,
    pub matched: Vec<(&'a D, &'a A)>,
    pub extra: Vec<&'a A>,
}

/// Pair desired and actual items by key.
///
/// Each actual item matches at most one desired item, duplicates on either side
/// end up in `missing` or `extra`.
pub fn diff_by_key<'a, D, A, K, FD, FA>(
    desired: &'a [D],
    actual: &'a [A],
    desired_key: FD,
    actual_key: FA,
) -> SetDiff<'a, D, A>
where
    K: Eq + Hash,
    FD: Fn(&'a D) -> K,
    FA: Fn(&'a A) -> K,
{
    let mut used: HashSet<usize> = HashSet::new();
    let mut missing = Vec::new();
    let mut matched = Vec::new();

    for d in desired {
        let key = desired_key(d);
        let found = actual
            .iter()
            .enumerate()
            .find(|(i, a)| !used.contains(i) && actual_key(*a) == key);
        match found {
            Some((i, a)) => {
                used.insert(i);
                matched.push((d, a));
            }
            None => missing.push(d),
        }
    }

    let extra = actual
        .iter()
        .enumerate()
        .filter(|(i, _)| !used.contains(i))
        .map(|(_, a)| a)
        .collect();

    SetDiff {
        missing,
        matched,
        extra,
    }
}
