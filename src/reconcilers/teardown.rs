// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Best-effort cleanup of a deleted ImageRepository

use super::Context;
use crate::credentials::naming::push_secret_name;
use crate::credentials::{delete_robot, expected_robot_name, unlink_secret};
use crate::error::Result;
use crate::types::{DesiredRepository, ImageRepository};
use kube::ResourceExt;
use tracing::{info, instrument, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    Skipped,
    Failed,
}

/// Outcome of every cleanup step, collected for logging
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub steps: Vec<(&'static str, StepOutcome)>,
}

impl TeardownReport {
    fn record(&mut self, step: &'static str, outcome: StepOutcome) {
        self.steps.push((step, outcome));
    }

    pub fn outcome(&self, step: &str) -> Option<StepOutcome> {
        self.steps
            .iter()
            .find(|(name, _)| *name == step)
            .map(|(_, outcome)| *outcome)
    }

    pub fn failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, o)| *o == StepOutcome::Failed)
            .count()
    }
}

fn robot_outcome(name: &str, deleted: bool) -> StepOutcome {
    match (name.is_empty(), deleted) {
        (true, _) => StepOutcome::Skipped,
        (false, true) => StepOutcome::Done,
        (false, false) => StepOutcome::Failed,
    }
}

/// Recorded name, or the deterministic one when provisioning stopped before the status write
fn recorded_or_expected(recorded: &str, expected: impl FnOnce() -> Option<String>) -> String {
    match recorded {
        "" => expected().unwrap_or_default(),
        name => name.to_string(),
    }
}

/// Another ImageRepository of the namespace points at the same image URL
async fn is_shared(ctx: &Context, repo: &ImageRepository, url: &str) -> Result<bool> {
    let namespace = repo.namespace().unwrap_or_default();
    let uid = repo.uid();
    let others = ctx.store.list_image_repositories(&namespace).await?;
    Ok(others
        .iter()
        .filter(|other| other.uid() != uid || other.name_any() != repo.name_any())
        .any(|other| other.image_url() == url))
}

async fn delete_repository(
    ctx: &Context,
    repo: &ImageRepository,
    desired: &DesiredRepository,
) -> StepOutcome {
    if desired.skip_repository_deletion {
        info!("Repository deletion disabled by annotation");
        return StepOutcome::Skipped;
    }

    let url = match repo.image_url() {
        "" => ctx.config.image_url(&desired.name),
        url => url.to_string(),
    };
    let name = url
        .strip_prefix(&ctx.config.image_url_prefix())
        .unwrap_or(&desired.name)
        .to_string();

    match is_shared(ctx, repo, &url).await {
        Ok(true) => {
            info!("Repository {} is used by another ImageRepository, keeping it", url);
            return StepOutcome::Skipped;
        }
        Ok(false) => {}
        Err(e) => {
            warn!("Cannot verify whether {} is shared, keeping it: {}", url, e);
            return StepOutcome::Failed;
        }
    }

    match ctx.registry.delete_repository(ctx.org(), &name).await {
        Ok(_) => {
            info!("Deleted repository {}", name);
            StepOutcome::Done
        }
        Err(e) => {
            warn!("Failed to delete repository {}: {}", name, e);
            StepOutcome::Failed
        }
    }
}

/// Run every cleanup step independently, then release the finalizer
#[instrument(skip_all, fields(repository = %desired.key()))]
pub async fn teardown(
    ctx: &Context,
    mut repo: ImageRepository,
    desired: &DesiredRepository,
) -> Result<TeardownReport> {
    let mut report = TeardownReport::default();
    let credentials = repo.status_or_default().credentials;
    let push_secret = recorded_or_expected(&credentials.push_secret_name, || {
        Some(push_secret_name(&desired.object_name))
    });
    let push = recorded_or_expected(&credentials.push_robot_account_name, || {
        expected_robot_name(desired, false)
    });
    let pull = recorded_or_expected(&credentials.pull_robot_account_name, || {
        desired
            .is_component_linked()
            .then(|| expected_robot_name(desired, true))
            .flatten()
    });

    let unlink = match unlink_secret(
        ctx.store.as_ref(),
        &desired.namespace,
        &ctx.config.pipeline_service_account,
        &push_secret,
    )
    .await
    {
        Ok(()) => StepOutcome::Done,
        Err(e) => {
            warn!("Failed to unlink push secret: {}", e);
            StepOutcome::Failed
        }
    };
    report.record("unlink_push_secret", unlink);

    let deleted = delete_robot(ctx.registry.as_ref(), ctx.org(), &push).await;
    report.record("delete_push_robot", robot_outcome(&push, deleted));

    let deleted = delete_robot(ctx.registry.as_ref(), ctx.org(), &pull).await;
    report.record("delete_pull_robot", robot_outcome(&pull, deleted));

    report.record(
        "delete_repository",
        delete_repository(ctx, &repo, desired).await,
    );

    if report.failures() > 0 {
        warn!(
            "Cleanup finished with {} failed step(s): {:?}",
            report.failures(),
            report.steps
        );
    }

    repo.remove_finalizer();
    ctx.store.replace_image_repository(&repo).await?;
    info!("Finalizer removed");
    Ok(report)
}
