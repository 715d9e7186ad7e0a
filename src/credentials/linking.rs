// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Linking of push secrets into the build pipeline service account

use crate::error::{ControllerError, Result};
use crate::kubernetes::ResourceStore;
use k8s_openapi::api::core::v1::{LocalObjectReference, ObjectReference};
use tracing::{info, instrument};

/// Reference lists of a service account after a link repair
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkRepair {
    pub secrets: Vec<ObjectReference>,
    pub image_pull_secrets: Vec<LocalObjectReference>,
    pub changed: bool,
}

fn secret_ref(name: &str) -> ObjectReference {
    ObjectReference {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn refers_to(reference: &ObjectReference, name: &str) -> bool {
    reference.name.as_deref() == Some(name)
}

/// Compute the reference lists for `target`.
///
/// A missing secret is dropped from both lists. An existing secret appears exactly
/// once in `secrets` and never in the legacy `image_pull_secrets` list.
pub fn repair_links(
    secrets: &[ObjectReference],
    image_pull_secrets: &[LocalObjectReference],
    target: &str,
    secret_exists: bool,
) -> LinkRepair {
    let mut repaired = LinkRepair::default();
    let mut linked = false;

    for reference in secrets {
        if refers_to(reference, target) {
            if secret_exists && !linked {
                linked = true;
                repaired.secrets.push(reference.clone());
            } else {
                repaired.changed = true;
            }
        } else {
            repaired.secrets.push(reference.clone());
        }
    }

    if secret_exists && !linked {
        repaired.secrets.push(secret_ref(target));
        repaired.changed = true;
    }

    for reference in image_pull_secrets {
        if reference.name == target {
            repaired.changed = true;
        } else {
            repaired.image_pull_secrets.push(reference.clone());
        }
    }

    repaired
}

async fn update_links(
    store: &dyn ResourceStore,
    namespace: &str,
    service_account: &str,
    secret_name: &str,
    secret_exists: bool,
    missing_account_is_error: bool,
) -> Result<()> {
    let Some(mut account) = store.get_service_account(namespace, service_account).await? else {
        if missing_account_is_error {
            return Err(ControllerError::ServiceAccountNotFound(format!(
                "{}/{}",
                namespace, service_account
            )));
        }
        return Ok(());
    };

    let repaired = repair_links(
        account.secrets.as_deref().unwrap_or_default(),
        account.image_pull_secrets.as_deref().unwrap_or_default(),
        secret_name,
        secret_exists,
    );
    if !repaired.changed {
        return Ok(());
    }

    account.secrets = Some(repaired.secrets);
    account.image_pull_secrets = Some(repaired.image_pull_secrets);
    store.replace_service_account(&account).await?;
    info!(
        "Updated secret links of service account {}/{} for {}",
        namespace, service_account, secret_name
    );
    Ok(())
}

/// Link an existing secret; the service account must exist
#[instrument(skip(store))]
pub async fn link_secret(
    store: &dyn ResourceStore,
    namespace: &str,
    service_account: &str,
    secret_name: &str,
) -> Result<()> {
    update_links(store, namespace, service_account, secret_name, true, true).await
}

/// Remove every reference to the secret; a missing service account is fine
#[instrument(skip(store))]
pub async fn unlink_secret(
    store: &dyn ResourceStore,
    namespace: &str,
    service_account: &str,
    secret_name: &str,
) -> Result<()> {
    update_links(store, namespace, service_account, secret_name, false, false).await
}

/// Repair links based on whether the secret currently exists
#[instrument(skip(store))]
pub async fn verify_and_fix_links(
    store: &dyn ResourceStore,
    namespace: &str,
    service_account: &str,
    secret_name: &str,
) -> Result<()> {
    let exists = store.get_secret(namespace, secret_name).await?.is_some();
    if !exists {
        info!(
            "Secret {}/{} does not exist, unlinking it from {}",
            namespace, secret_name, service_account
        );
    }
    update_links(store, namespace, service_account, secret_name, exists, false).await
}
