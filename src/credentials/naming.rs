// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Naming rules for robot accounts, secrets and teams.

use sha2::{Digest, Sha256};

const MAX_SOURCE_LENGTH: usize = 220;
const SUFFIX_LENGTH: usize = 10;
const PUSH_SECRET_SUFFIX: &str = "-image-push";
const PULL_SECRET_SUFFIX: &str = "-image-pull";

fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

fn collapse_underscores(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Ten lowercase hex characters identifying one owner object.
///
/// Derived from the object uid so that redelivered reconciliations reuse the same
/// robot accounts; a fresh random value is used when no uid is known.
pub fn robot_suffix(uid: Option<&str>) -> String {
    match uid.filter(|u| !u.is_empty()) {
        Some(uid) => {
            let digest = Sha256::digest(uid.as_bytes());
            digest
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<String>()[..SUFFIX_LENGTH]
                .to_string()
        }
        None => uuid::Uuid::new_v4().simple().to_string()[..SUFFIX_LENGTH].to_string(),
    }
}

/// Robot account name for a repository, matching `^[a-z][a-z0-9_]{1,254}$`
pub fn generate_robot_account_name(repository: &str, suffix: &str, is_pull_only: bool) -> String {
    let base: String = truncate(repository, MAX_SOURCE_LENGTH)
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();

    let mut name = format!("{}_{}", base, suffix);
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        name.insert(0, 'x');
    }
    if is_pull_only {
        name.push_str("_pull");
    }
    collapse_underscores(&name)
}

pub fn push_secret_name(object_name: &str) -> String {
    format!("{}{}", truncate(object_name, MAX_SOURCE_LENGTH), PUSH_SECRET_SUFFIX)
}

pub fn pull_secret_name(object_name: &str) -> String {
    format!("{}{}", truncate(object_name, MAX_SOURCE_LENGTH), PULL_SECRET_SUFFIX)
}

/// Registry team holding the additional users of one namespace
pub fn team_name(namespace: &str) -> String {
    let mut team = namespace.replace('-', "x");
    if team.starts_with(|c: char| c.is_ascii_digit()) {
        team.insert(0, 'x');
    }
    team.push_str("xteam");
    team
}
