// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Repository event notifications

use super::diff_by_key;
use crate::constants::messages;
use crate::error::Result;
use crate::registry::{Notification, RegistryError, RegistryService};
use crate::types::{NotificationSpec, NotificationStatus};
use tracing::{info, instrument, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationOp {
    Create(Notification),
    Update {
        uuid: String,
        notification: Notification,
    },
    Delete {
        uuid: String,
        title: String,
    },
}

impl NotificationOp {
    fn title(&self) -> &str {
        match self {
            NotificationOp::Create(n) => &n.title,
            NotificationOp::Update { notification, .. } => &notification.title,
            NotificationOp::Delete { title, .. } => title,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NotificationSyncOutcome {
    /// Notifications present in the registry after the sync
    pub notifications: Vec<NotificationStatus>,
    /// Messages of notifications the registry refused
    pub rejected: Vec<String>,
}

/// Compute the registry calls turning `actual` into `desired`.
///
/// Exact matches on (title, event, method, config) need no call. Remaining items
/// sharing a title become updates of the existing registry id.
pub fn plan_notification_changes(
    desired: &[NotificationSpec],
    actual: &[Notification],
) -> Vec<NotificationOp> {
    let wanted: Vec<Notification> = desired.iter().map(Notification::from_spec).collect();
    let exact = diff_by_key(&wanted, actual, |n| n.identity(), |a| a.identity());
    let by_title = diff_by_key(
        &exact.missing,
        &exact.extra,
        |n| n.title.as_str(),
        |a| a.title.as_str(),
    );

    let mut ops = Vec::new();
    for (desired, existing) in by_title.matched {
        ops.push(NotificationOp::Update {
            uuid: existing.uuid.clone(),
            notification: (*desired).clone(),
        });
    }
    for desired in by_title.missing {
        ops.push(NotificationOp::Create((*desired).clone()));
    }
    for existing in by_title.extra {
        ops.push(NotificationOp::Delete {
            uuid: existing.uuid.clone(),
            title: existing.title.clone(),
        });
    }
    ops
}

fn to_status(notification: Notification) -> NotificationStatus {
    NotificationStatus {
        title: notification.title,
        event: notification.event,
        method: notification.method,
        config: notification.config,
        uuid: notification.uuid,
    }
}

async fn apply(
    registry: &dyn RegistryService,
    org: &str,
    repository: &str,
    op: &NotificationOp,
) -> std::result::Result<(), RegistryError> {
    match op {
        NotificationOp::Create(notification) => {
            info!("Creating notification '{}'", notification.title);
            registry
                .create_notification(org, repository, notification)
                .await?;
        }
        NotificationOp::Update { uuid, notification } => {
            info!("Updating notification '{}' ({})", notification.title, uuid);
            registry
                .update_notification(org, repository, uuid, notification)
                .await?;
        }
        NotificationOp::Delete { uuid, title } => {
            info!("Deleting notification '{}' ({})", title, uuid);
            registry.delete_notification(org, repository, uuid).await?;
        }
    }
    Ok(())
}

/// Bring the registry notifications of one repository in line with `desired`.
///
/// Rejected notifications are reported in the outcome; transport and server
/// failures abort the sync.
#[instrument(skip(registry, desired))]
pub async fn sync_notifications(
    registry: &dyn RegistryService,
    org: &str,
    repository: &str,
    desired: &[NotificationSpec],
) -> Result<NotificationSyncOutcome> {
    let actual = registry.list_notifications(org, repository).await?;
    let ops = plan_notification_changes(desired, &actual);
    if ops.is_empty() {
        return Ok(NotificationSyncOutcome {
            notifications: actual.into_iter().map(to_status).collect(),
            rejected: Vec::new(),
        });
    }

    let mut rejected = Vec::new();
    for op in &ops {
        match apply(registry, org, repository, op).await {
            Ok(()) => {}
            Err(e @ (RegistryError::BadRequest(_) | RegistryError::NotFound)) => {
                warn!("Registry rejected notification '{}': {}", op.title(), e);
                rejected.push(format!(
                    "{}{}': {}",
                    messages::NOTIFICATION_REJECTED_PREFIX,
                    op.title(),
                    e
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let refreshed = registry.list_notifications(org, repository).await?;
    Ok(NotificationSyncOutcome {
        notifications: refreshed.into_iter().map(to_status).collect(),
        rejected,
    })
}
