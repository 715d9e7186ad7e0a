// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! First-time provisioning of an ImageRepository

use super::Context;
use crate::constants::{messages, users_config_map, DEFAULT_REPOSITORY_DESCRIPTION};
use crate::credentials::provision_access;
use crate::error::{ControllerError, Result};
use crate::registry::{RegistryError, RepositoryRequest};
use crate::sync::{ensure_team_access, sync_notifications};
use crate::types::image_repository::{
    CredentialsStatus, ImageStatus, RepositoryState,
};
use crate::types::{Component, DesiredRepository, ImageRepository, ImageRepositoryStatus};
use chrono::Utc;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use tracing::{info, instrument, warn};

fn repository_description(desired: &DesiredRepository, component: Option<&Component>) -> String {
    if let Some(description) = &desired.description {
        return description.clone();
    }
    match component.and_then(Component::git_url) {
        Some(url) => format!(
            "This container is built from: {}\nPlease get more details there.",
            url
        ),
        None => DEFAULT_REPOSITORY_DESCRIPTION.to_string(),
    }
}

async fn write_status(
    ctx: &Context,
    mut repo: ImageRepository,
    status: ImageRepositoryStatus,
) -> Result<ImageRepository> {
    repo.status = Some(status);
    ctx.store.replace_image_repository_status(&repo).await
}

/// The namespace team is granted only when the allow-list ConfigMap lists users
async fn team_configured(ctx: &Context, namespace: &str) -> Result<bool> {
    Ok(ctx
        .store
        .get_config_map(namespace, users_config_map::NAME)
        .await?
        .and_then(|cm| cm.data)
        .is_some_and(|data| data.contains_key(users_config_map::KEY)))
}

fn link_owner(repo: &mut ImageRepository, component: &Component) {
    match component.owner_ref(&()) {
        Some(owner) => {
            if !repo.owner_references().iter().any(|r| r.uid == owner.uid) {
                repo.owner_references_mut().push(owner);
            }
        }
        None => warn!(
            "Component {} has no uid, skipping owner reference",
            component.name_any()
        ),
    }
}

/// Run the provisioning workflow.
///
/// Every step tolerates work left behind by an earlier interrupted run.
#[instrument(skip_all, fields(repository = %desired.key()))]
pub async fn provision(
    ctx: &Context,
    mut repo: ImageRepository,
    desired: &DesiredRepository,
) -> Result<Action> {
    let org = ctx.org();

    let component = match &desired.link {
        Some(link) => {
            match ctx
                .store
                .get_component(&desired.namespace, &link.component)
                .await?
            {
                Some(component) => Some(component),
                None => {
                    let mut status = repo.status_or_default();
                    status.message = format!("Component '{}' does not exist", link.component);
                    write_status(ctx, repo, status).await?;
                    return Err(ControllerError::ComponentNotFound(link.component.clone()));
                }
            }
        }
        None => None,
    };

    if repo.spec.image.name != desired.name {
        info!("Persisting repository name {}", desired.name);
        repo.spec.image.name = desired.name.clone();
        repo = ctx.store.replace_image_repository(&repo).await?;
    }

    let visibility = desired.visibility_or_default();
    let request = RepositoryRequest {
        namespace: org.to_string(),
        repository: desired.name.clone(),
        visibility,
        description: repository_description(desired, component.as_ref()),
    };
    match ctx.registry.create_repository(&request).await {
        Ok(Some(created)) => info!("Created repository {}/{}", org, created.name),
        Ok(None) => {
            return Err(ControllerError::UnexpectedResponse(format!(
                "empty response creating repository {}",
                desired.name
            )))
        }
        Err(RegistryError::AlreadyExists) => {
            info!("Repository {} already exists", desired.name)
        }
        Err(RegistryError::PlanLimitExceeded) => {
            warn!("Plan limit reached creating {}", desired.name);
            let mut status = repo.status_or_default();
            status.state = Some(RepositoryState::Failed);
            status.message = messages::PLAN_LIMIT_ON_CREATE.to_string();
            write_status(ctx, repo, status).await?;
            return Ok(Action::await_change());
        }
        Err(e) => return Err(e.into()),
    }

    let push = provision_access(
        ctx.registry.as_ref(),
        ctx.store.as_ref(),
        &ctx.config,
        &repo,
        desired,
        false,
    )
    .await?;
    let pull = if desired.is_component_linked() {
        Some(
            provision_access(
                ctx.registry.as_ref(),
                ctx.store.as_ref(),
                &ctx.config,
                &repo,
                desired,
                true,
            )
            .await?,
        )
    } else {
        None
    };

    if team_configured(ctx, &desired.namespace).await? {
        ensure_team_access(ctx.registry.as_ref(), org, &desired.namespace, &desired.name).await?;
    }

    let notifications =
        sync_notifications(ctx.registry.as_ref(), org, &desired.name, &desired.notifications)
            .await?;

    let previous = repo.status_or_default();
    repo.add_finalizer();
    if let Some(component) = &component {
        link_owner(&mut repo, component);
    }
    let repo = ctx.store.replace_image_repository(&repo).await?;

    let pull = pull.unwrap_or_default();
    let status = ImageRepositoryStatus {
        state: Some(RepositoryState::Ready),
        message: notifications.rejected.join("; "),
        image: ImageStatus {
            url: ctx.config.image_url(&desired.name),
            visibility: Some(visibility),
        },
        credentials: CredentialsStatus {
            generation_timestamp: previous
                .credentials
                .generation_timestamp
                .or_else(|| Some(Utc::now())),
            push_robot_account_name: push.robot_account_name,
            push_secret_name: push.secret_name,
            pull_robot_account_name: pull.robot_account_name,
            pull_secret_name: pull.secret_name,
        },
        notifications: notifications.notifications,
    };
    write_status(ctx, repo, status).await?;
    info!("Repository {} is ready", desired.name);

    Ok(Action::await_change())
}
