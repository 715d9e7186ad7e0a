// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Single-step actions applied to a Ready ImageRepository

use super::Context;
use crate::constants::{annotations, messages};
use crate::credentials::{next_generation_timestamp, rotate_credentials, verify_and_fix_links};
use crate::error::Result;
use crate::registry::RegistryError;
use crate::sync::sync_notifications;
use crate::types::{DesiredRepository, ImageRepository, Visibility};
use kube::ResourceExt;
use tracing::{info, instrument, warn};

/// Copy the image URL onto the linked Component, then drop the request annotation
#[instrument(skip_all, fields(repository = %desired.key()))]
pub async fn update_component_image(
    ctx: &Context,
    mut repo: ImageRepository,
    desired: &DesiredRepository,
) -> Result<()> {
    if let Some(link) = &desired.link {
        let url = repo.image_url().to_string();
        if ctx
            .store
            .set_component_image(&desired.namespace, &link.component, &url)
            .await?
        {
            info!("Set image {} on component {}", url, link.component);
        } else {
            warn!(
                "Component {} does not exist, image not propagated",
                link.component
            );
        }
    }

    repo.annotations_mut()
        .remove(annotations::UPDATE_COMPONENT_IMAGE);
    ctx.store.replace_image_repository(&repo).await?;
    Ok(())
}

/// Restore the provisioned repository name after an external edit
#[instrument(skip(ctx, repo))]
pub async fn revert_name(ctx: &Context, mut repo: ImageRepository, observed: &str) -> Result<()> {
    warn!(
        "Repository name changed to {}, reverting to {}",
        repo.spec.image.name, observed
    );
    repo.spec.image.name = observed.to_string();
    ctx.store.replace_image_repository(&repo).await?;
    Ok(())
}

/// Apply a visibility change; a plan rejection reverts the requested value
#[instrument(skip(ctx, repo, desired), fields(repository = %desired.name))]
pub async fn change_visibility(
    ctx: &Context,
    mut repo: ImageRepository,
    desired: &DesiredRepository,
    requested: Visibility,
) -> Result<()> {
    match ctx
        .registry
        .change_visibility(ctx.org(), &desired.name, requested)
        .await
    {
        Ok(()) => {
            info!("Changed visibility to {}", requested);
            let mut status = repo.status_or_default();
            status.image.visibility = Some(requested);
            status.message.clear();
            repo.status = Some(status);
            ctx.store.replace_image_repository_status(&repo).await?;
            Ok(())
        }
        Err(RegistryError::PlanLimitExceeded) => {
            let mut status = repo.status_or_default();
            warn!(
                "Plan limit rejected visibility {}, reverting request to {:?}",
                requested, status.image.visibility
            );
            repo.spec.image.visibility = status.image.visibility;
            let mut repo = ctx.store.replace_image_repository(&repo).await?;

            status.message = messages::PLAN_LIMIT_ON_VISIBILITY.to_string();
            repo.status = Some(status);
            ctx.store.replace_image_repository_status(&repo).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Rotate all robot tokens, clear the request, then record the new generation
#[instrument(skip_all, fields(repository = %repo.name_any()))]
pub async fn rotate(ctx: &Context, mut repo: ImageRepository) -> Result<()> {
    rotate_credentials(
        ctx.registry.as_ref(),
        ctx.store.as_ref(),
        &ctx.config,
        &repo,
    )
    .await?;

    if let Some(credentials) = repo.spec.credentials.as_mut() {
        credentials.regenerate_token = None;
    }
    let mut repo = ctx.store.replace_image_repository(&repo).await?;

    let mut status = repo.status_or_default();
    status.credentials.generation_timestamp =
        Some(next_generation_timestamp(status.credentials.generation_timestamp));
    repo.status = Some(status);
    ctx.store.replace_image_repository_status(&repo).await?;
    info!("Credentials rotated");
    Ok(())
}

/// Repair the push secret link, then clear the request
#[instrument(skip_all, fields(repository = %repo.name_any()))]
pub async fn verify_linking(ctx: &Context, mut repo: ImageRepository) -> Result<()> {
    let namespace = repo.namespace().unwrap_or_default();
    let secret_name = repo.status_or_default().credentials.push_secret_name;
    verify_and_fix_links(
        ctx.store.as_ref(),
        &namespace,
        &ctx.config.pipeline_service_account,
        &secret_name,
    )
    .await?;

    if let Some(credentials) = repo.spec.credentials.as_mut() {
        credentials.verify_linking = None;
    }
    ctx.store.replace_image_repository(&repo).await?;
    Ok(())
}

/// Sync notifications and persist the status when it changed
#[instrument(skip_all, fields(repository = %desired.name))]
pub async fn refresh_notifications(
    ctx: &Context,
    mut repo: ImageRepository,
    desired: &DesiredRepository,
) -> Result<()> {
    let outcome = sync_notifications(
        ctx.registry.as_ref(),
        ctx.org(),
        &desired.name,
        &desired.notifications,
    )
    .await?;

    let current = repo.status_or_default();
    let mut status = current.clone();
    status.notifications = outcome.notifications;
    if !outcome.rejected.is_empty() {
        status.message = outcome.rejected.join("; ");
    } else if status
        .message
        .starts_with(messages::NOTIFICATION_REJECTED_PREFIX)
    {
        status.message.clear();
    }

    if status != current {
        repo.status = Some(status);
        ctx.store.replace_image_repository_status(&repo).await?;
    }
    Ok(())
}
