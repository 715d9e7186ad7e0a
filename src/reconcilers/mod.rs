// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod image_repository;
pub mod maintenance;
pub mod provision;
pub mod teardown;
pub mod users_config_map;

pub use image_repository::{reconcile_image_repository, ImageRepositoryReconciler};
pub use users_config_map::{reconcile_users_config_map, UsersConfigMapReconciler};

use crate::config::Config;
use crate::constants::ERROR_REQUEUE_SECS;
use crate::error::ControllerError;
use crate::kubernetes::ResourceStore;
use crate::registry::RegistryService;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Collaborators shared by every reconciliation
pub struct Context {
    pub registry: Arc<dyn RegistryService>,
    pub store: Arc<dyn ResourceStore>,
    pub config: Config,
}

impl Context {
    pub fn new(
        registry: Arc<dyn RegistryService>,
        store: Arc<dyn ResourceStore>,
        config: Config,
    ) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    pub fn org(&self) -> &str {
        &self.config.organization
    }
}

fn error_policy<K: ResourceExt>(obj: Arc<K>, error: &ControllerError, _ctx: Arc<Context>) -> Action {
    error!(
        "Reconciliation of {}/{} failed: {}",
        obj.namespace().unwrap_or_default(),
        obj.name_any(),
        error
    );
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}

#[cfg(test)]
pub(crate) fn make_context(
    registry: &crate::test_utils::FakeRegistry,
    store: &crate::test_utils::FakeStore,
) -> Context {
    Context::new(
        Arc::new(registry.clone()),
        Arc::new(store.clone()),
        crate::config::test_config(),
    )
}
