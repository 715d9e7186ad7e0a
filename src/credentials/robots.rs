// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Robot account lifecycle: creation with scoped access, token rotation, removal

use super::linking::link_secret;
use super::naming::{generate_robot_account_name, pull_secret_name, push_secret_name, robot_suffix};
use super::secrets::ensure_secret;
use crate::config::Config;
use crate::error::{ControllerError, Result};
use crate::kubernetes::ResourceStore;
use crate::registry::{RegistryError, RegistryService, RobotAccount};
use crate::types::image_repository::AccessCredentials;
use crate::types::{DesiredRepository, ImageRepository};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

/// Create the robot account, falling back to the existing one on conflict
async fn create_or_get_robot(
    registry: &dyn RegistryService,
    org: &str,
    name: &str,
) -> Result<RobotAccount> {
    match registry.create_robot_account(org, name).await {
        Ok(Some(robot)) => Ok(robot),
        Ok(None) => Err(ControllerError::UnexpectedResponse(format!(
            "empty response creating robot account {}",
            name
        ))),
        Err(RegistryError::AlreadyExists) => {
            info!("Robot account {} already exists, reusing it", name);
            Ok(registry.get_robot_account(org, name).await?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deterministic robot account name of a repository, `None` when the owner has no uid
pub fn expected_robot_name(desired: &DesiredRepository, is_pull_only: bool) -> Option<String> {
    let uid = desired.uid.as_deref().filter(|uid| !uid.is_empty())?;
    Some(generate_robot_account_name(
        &desired.name,
        &robot_suffix(Some(uid)),
        is_pull_only,
    ))
}

/// Provision a robot account with access to the repository and materialize its secret.
///
/// Push accounts get write access and their secret is linked to the pipeline
/// service account; pull accounts get read access only.
#[instrument(skip_all, fields(repository = %desired.name, pull = is_pull_only))]
pub async fn provision_access(
    registry: &dyn RegistryService,
    store: &dyn ResourceStore,
    config: &Config,
    owner: &ImageRepository,
    desired: &DesiredRepository,
    is_pull_only: bool,
) -> Result<AccessCredentials> {
    let org = &config.organization;
    let robot_name = match expected_robot_name(desired, is_pull_only) {
        Some(name) => name,
        None => generate_robot_account_name(&desired.name, &robot_suffix(None), is_pull_only),
    };

    let robot = create_or_get_robot(registry, org, &robot_name).await?;
    registry
        .add_permission(org, &desired.name, &robot.name, !is_pull_only)
        .await?;

    let secret_name = if is_pull_only {
        pull_secret_name(&desired.object_name)
    } else {
        push_secret_name(&desired.object_name)
    };
    let image_url = config.image_url(&desired.name);
    ensure_secret(
        store,
        owner,
        &secret_name,
        &robot.name,
        &robot.token,
        &image_url,
    )
    .await?;

    if !is_pull_only {
        link_secret(
            store,
            &desired.namespace,
            &config.pipeline_service_account,
            &secret_name,
        )
        .await?;
    }

    Ok(AccessCredentials {
        robot_account_name: robot.short_name().to_string(),
        secret_name,
    })
}

/// Issue a new token for one robot account and overwrite its secret
pub async fn rotate_token(
    registry: &dyn RegistryService,
    store: &dyn ResourceStore,
    config: &Config,
    owner: &ImageRepository,
    credentials: &AccessCredentials,
) -> Result<()> {
    let robot = registry
        .regenerate_token(&config.organization, &credentials.robot_account_name)
        .await?;
    let image_url = owner.image_url().to_string();
    ensure_secret(
        store,
        owner,
        &credentials.secret_name,
        &robot.name,
        &robot.token,
        &image_url,
    )
    .await?;
    info!(
        "Regenerated token of robot account {}",
        credentials.robot_account_name
    );
    Ok(())
}

/// Rotate push and, when present, pull credentials of a Ready repository
#[instrument(skip_all, fields(repository = %owner.image_url()))]
pub async fn rotate_credentials(
    registry: &dyn RegistryService,
    store: &dyn ResourceStore,
    config: &Config,
    owner: &ImageRepository,
) -> Result<()> {
    let status = owner.status_or_default().credentials;
    let push = AccessCredentials {
        robot_account_name: status.push_robot_account_name,
        secret_name: status.push_secret_name,
    };
    rotate_token(registry, store, config, owner, &push).await?;

    if !status.pull_robot_account_name.is_empty() {
        let pull = AccessCredentials {
            robot_account_name: status.pull_robot_account_name,
            secret_name: status.pull_secret_name,
        };
        rotate_token(registry, store, config, owner, &pull).await?;
    }
    Ok(())
}

/// Delete a robot account, logging instead of failing
pub async fn delete_robot(registry: &dyn RegistryService, org: &str, name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    match registry.delete_robot_account(org, name).await {
        Ok(_) => {
            info!("Deleted robot account {}", name);
            true
        }
        Err(e) => {
            warn!("Failed to delete robot account {}: {}", name, e);
            false
        }
    }
}

/// Timestamp for a new credential generation, strictly after `previous`
pub fn next_generation_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}
