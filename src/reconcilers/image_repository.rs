// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ImageRepository reconciler - drives each repository object through its lifecycle.
//!
//! Every invocation inspects the object, picks exactly one [`Decision`] and
//! performs only that action. Redelivery after a crash re-enters the state
//! machine and continues with the remaining idempotent work.

use super::{error_policy, maintenance, provision::provision, teardown::teardown, Context};
use crate::config::Config;
use crate::error::Result;
use crate::types::{DesiredRepository, ImageRepository, RepositoryState, Visibility};
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The single action taken by one reconciliation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Teardown,
    /// Permanently rejected by the registry, nothing left to do
    Halted,
    Provision,
    UpdateComponentImage,
    /// Waiting for an earlier step to settle
    Wait,
    /// Restore this repository name
    RevertName(String),
    ChangeVisibility(Visibility),
    Rotate,
    VerifyLinking,
    SyncNotifications,
}

/// Repository name recorded by the last successful provisioning
fn observed_name<'a>(repo: &'a ImageRepository, config: &Config) -> Option<&'a str> {
    repo.image_url()
        .strip_prefix(&config.image_url_prefix())
        .filter(|name| !name.is_empty())
}

/// Pick the next action for an ImageRepository; the first matching rule wins
pub fn decide(repo: &ImageRepository, desired: &DesiredRepository, config: &Config) -> Decision {
    if repo.is_being_deleted() {
        return match repo.has_finalizer() {
            true => Decision::Teardown,
            false => Decision::Wait,
        };
    }

    let state = repo.state();
    if state == Some(RepositoryState::Failed) {
        return Decision::Halted;
    }

    if !repo.has_finalizer() || state.is_none() {
        return Decision::Provision;
    }

    if desired.update_component_image && desired.is_component_linked() && !repo.image_url().is_empty()
    {
        return Decision::UpdateComponentImage;
    }

    if state != Some(RepositoryState::Ready) {
        return Decision::Wait;
    }

    if let Some(observed) = observed_name(repo, config) {
        if observed != desired.name {
            return Decision::RevertName(observed.to_string());
        }
    }

    let status = repo.status_or_default();
    if let Some(requested) = desired.visibility {
        if status.image.visibility != Some(requested) {
            return Decision::ChangeVisibility(requested);
        }
    }

    if desired.regenerate_token {
        return Decision::Rotate;
    }

    if desired.verify_linking {
        return Decision::VerifyLinking;
    }

    Decision::SyncNotifications
}

/// Reconcile the ImageRepository stored under `namespace/name`
#[instrument(skip(ctx))]
pub async fn reconcile_image_repository(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<Action> {
    let Some(repo) = ctx.store.get_image_repository(namespace, name).await? else {
        debug!("ImageRepository no longer exists");
        return Ok(Action::await_change());
    };

    let desired = DesiredRepository::from_resource(&repo)?;
    let decision = decide(&repo, &desired, &ctx.config);
    debug!("Decision: {:?}", decision);

    match decision {
        Decision::Teardown => {
            teardown(ctx, repo, &desired).await?;
        }
        Decision::Halted => {
            debug!("Repository provisioning failed permanently, not retrying");
        }
        Decision::Provision => return provision(ctx, repo, &desired).await,
        Decision::UpdateComponentImage => {
            maintenance::update_component_image(ctx, repo, &desired).await?
        }
        Decision::Wait => {}
        Decision::RevertName(observed) => maintenance::revert_name(ctx, repo, &observed).await?,
        Decision::ChangeVisibility(requested) => {
            maintenance::change_visibility(ctx, repo, &desired, requested).await?
        }
        Decision::Rotate => maintenance::rotate(ctx, repo).await?,
        Decision::VerifyLinking => maintenance::verify_linking(ctx, repo).await?,
        Decision::SyncNotifications => {
            maintenance::refresh_notifications(ctx, repo, &desired).await?
        }
    }

    Ok(Action::await_change())
}

pub struct ImageRepositoryReconciler {
    client: Client,
    context: Arc<Context>,
}

impl ImageRepositoryReconciler {
    pub fn new(client: Client, context: Arc<Context>) -> Self {
        Self { client, context }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let repositories: Api<ImageRepository> = match &self.context.config.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };

        info!("Watching ImageRepository resources");
        Controller::new(repositories, watcher::Config::default())
            .run(reconcile, error_policy, self.context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled image repository: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(repo: Arc<ImageRepository>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = repo.namespace().unwrap_or_default();
    reconcile_image_repository(&ctx, &namespace, &repo.name_any()).await
}
