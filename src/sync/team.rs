// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace team holding the additional users allowed to read every repository

use super::diff_by_key;
use crate::credentials::naming::team_name;
use crate::error::Result;
use crate::kubernetes::ResourceStore;
use crate::registry::{RegistryError, RegistryService};
use tracing::{info, instrument};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TeamSyncOutcome {
    pub granted: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Users unknown to the registry
    pub skipped: Vec<String>,
    /// Team members as reported by the registry after the changes
    pub members: Vec<String>,
}

/// Parse the whitespace-separated user list of the allow-list ConfigMap
pub fn parse_users(value: &str) -> Vec<String> {
    let mut users: Vec<String> = Vec::new();
    for user in value.split_whitespace() {
        if !users.iter().any(|u| u == user) {
            users.push(user.to_string());
        }
    }
    users
}

/// Make sure the namespace team exists and can read `repository`
#[instrument(skip(registry))]
pub async fn ensure_team_access(
    registry: &dyn RegistryService,
    org: &str,
    namespace: &str,
    repository: &str,
) -> Result<()> {
    let team = team_name(namespace);
    registry.ensure_team(org, &team).await?;
    registry
        .add_read_permission_for_team(org, repository, &team)
        .await?;
    info!("Granted team {} read access to {}", team, repository);
    Ok(())
}

/// Reconcile the namespace team against the allow-listed users.
///
/// Every ImageRepository of the namespace is granted to the team, not only the
/// one that triggered the change. The reported members are fetched again once
/// all changes are applied.
#[instrument(skip(registry, store, users))]
pub async fn sync_team(
    registry: &dyn RegistryService,
    store: &dyn ResourceStore,
    org: &str,
    namespace: &str,
    users: &[String],
) -> Result<TeamSyncOutcome> {
    let team = team_name(namespace);
    let mut outcome = TeamSyncOutcome::default();

    let repositories: Vec<String> = store
        .list_image_repositories(namespace)
        .await?
        .into_iter()
        .map(|r| r.spec.image.name)
        .filter(|name| !name.is_empty())
        .collect();

    let members = registry.ensure_team(org, &team).await?;
    let granted = registry.list_team_repo_permissions(org, &team).await?;

    let repo_diff = diff_by_key(&repositories, &granted, |r| r.as_str(), |g| g.as_str());
    for repository in repo_diff.missing {
        info!("Granting team {} read access to {}", team, repository);
        registry
            .add_read_permission_for_team(org, repository, &team)
            .await?;
        outcome.granted.push(repository.clone());
    }

    let user_diff = diff_by_key(users, &members, |u| u.as_str(), |m| m.as_str());
    for user in user_diff.missing {
        match registry.add_user_to_team(org, &team, user).await {
            Ok(()) => {
                info!("Added user {} to team {}", user, team);
                outcome.added.push(user.clone());
            }
            Err(RegistryError::UserNotFound(_)) => {
                info!("User {} does not exist in the registry, skipping", user);
                outcome.skipped.push(user.clone());
            }
            Err(e) => return Err(e.into()),
        }
    }
    for member in user_diff.extra {
        info!("Removing user {} from team {}", member, team);
        registry.remove_user_from_team(org, &team, member).await?;
        outcome.removed.push(member.clone());
    }

    outcome.members = registry.ensure_team(org, &team).await?;
    Ok(outcome)
}
