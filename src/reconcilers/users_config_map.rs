// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Users ConfigMap reconciler - keeps the namespace team in line with its allow-list.

use super::{error_policy, Context};
use crate::constants::{finalizers, users_config_map};
use crate::credentials::naming::team_name;
use crate::error::Result;
use crate::sync::{sync_team, team::parse_users};
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

fn has_finalizer(config_map: &ConfigMap) -> bool {
    config_map
        .finalizers()
        .iter()
        .any(|f| f == finalizers::USERS_CONFIG_MAP)
}

/// Reconcile the allow-list ConfigMap of one namespace
#[instrument(skip(ctx))]
pub async fn reconcile_users_config_map(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<Action> {
    if name != users_config_map::NAME {
        return Ok(Action::await_change());
    }
    let Some(mut config_map) = ctx.store.get_config_map(namespace, name).await? else {
        debug!("Users ConfigMap no longer exists");
        return Ok(Action::await_change());
    };

    let deleting = config_map.metadata.deletion_timestamp.is_some();
    if !deleting && !has_finalizer(&config_map) {
        config_map
            .finalizers_mut()
            .push(finalizers::USERS_CONFIG_MAP.to_string());
        ctx.store.replace_config_map(&config_map).await?;
        info!("Added finalizer to users ConfigMap");
        return Ok(Action::await_change());
    }

    let users = config_map
        .data
        .as_ref()
        .and_then(|data| data.get(users_config_map::KEY))
        .map(|value| parse_users(value));

    match (deleting, users) {
        (false, Some(users)) => {
            let outcome = sync_team(
                ctx.registry.as_ref(),
                ctx.store.as_ref(),
                ctx.org(),
                namespace,
                &users,
            )
            .await?;
            if !outcome.skipped.is_empty() {
                warn!("Users not found in the registry: {:?}", outcome.skipped);
            }
            info!(
                "Team synced: {} granted, {} added, {} removed, members now {:?}",
                outcome.granted.len(),
                outcome.added.len(),
                outcome.removed.len(),
                outcome.members
            );
        }
        _ => {
            let team = team_name(namespace);
            ctx.registry.delete_team(ctx.org(), &team).await?;
            info!("Deleted team {}", team);

            if deleting && has_finalizer(&config_map) {
                config_map
                    .finalizers_mut()
                    .retain(|f| f != finalizers::USERS_CONFIG_MAP);
                ctx.store.replace_config_map(&config_map).await?;
                info!("Removed finalizer from users ConfigMap");
            }
        }
    }

    Ok(Action::await_change())
}

pub struct UsersConfigMapReconciler {
    client: Client,
    context: Arc<Context>,
}

impl UsersConfigMapReconciler {
    pub fn new(client: Client, context: Arc<Context>) -> Self {
        Self { client, context }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config_maps: Api<ConfigMap> = match &self.context.config.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        let selector = format!("metadata.name={}", users_config_map::NAME);

        info!("Watching {} ConfigMaps", users_config_map::NAME);
        Controller::new(config_maps, WatcherConfig::default().fields(&selector))
            .run(reconcile, error_policy, self.context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled users ConfigMap: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(config_map: Arc<ConfigMap>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = config_map.namespace().unwrap_or_default();
    reconcile_users_config_map(&ctx, &namespace, &config_map.name_any()).await
}
