// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Container registry capability used by the reconcilers.
//!
//! The reconcilers only see [`RegistryService`]; the production implementation
//! is [`quay::QuayClient`], tests use an in-memory double.

pub mod quay;

use crate::types::image_repository::{NotificationConfig, NotificationSpec, Visibility};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use quay::QuayClient;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("organization plan limit exceeded")]
    PlanLimitExceeded,

    #[error("already exists")]
    AlreadyExists,

    #[error("not found")]
    NotFound,

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unexpected response {0}: {1}")]
    Unexpected(u16, String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RepositoryRequest {
    pub namespace: String,
    pub repository: String,
    pub visibility: Visibility,
    pub description: String,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Repository {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RobotAccount {
    /// Full name as reported by the registry, e.g. `org+robot`
    pub name: String,
    #[serde(default)]
    pub token: String,
}

impl RobotAccount {
    /// Name without the `org+` prefix
    pub fn short_name(&self) -> &str {
        self.name
            .split_once('+')
            .map(|(_, short)| short)
            .unwrap_or(&self.name)
    }
}

/// Notification as stored in the registry
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Notification {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub title: String,
    pub event: String,
    pub method: String,
    #[serde(default)]
    pub config: NotificationConfig,
}

impl Notification {
    pub fn from_spec(spec: &NotificationSpec) -> Self {
        Notification {
            uuid: String::new(),
            title: spec.title.clone(),
            event: spec.event.as_str().to_string(),
            method: spec.method.as_str().to_string(),
            config: spec.config.clone(),
        }
    }

    /// Identity used for diffing, the registry id is ignored
    pub fn identity(&self) -> (&str, &str, &str, &NotificationConfig) {
        (&self.title, &self.event, &self.method, &self.config)
    }
}

#[async_trait]
pub trait RegistryService: Send + Sync {
    /// `Ok(None)` signals a success response without a body
    async fn create_repository(&self, request: &RepositoryRequest)
        -> RegistryResult<Option<Repository>>;
    async fn delete_repository(&self, org: &str, repository: &str) -> RegistryResult<bool>;
    async fn change_visibility(
        &self,
        org: &str,
        repository: &str,
        visibility: Visibility,
    ) -> RegistryResult<()>;

    async fn create_robot_account(&self, org: &str, name: &str)
        -> RegistryResult<Option<RobotAccount>>;
    async fn get_robot_account(&self, org: &str, name: &str) -> RegistryResult<RobotAccount>;
    async fn regenerate_token(&self, org: &str, name: &str) -> RegistryResult<RobotAccount>;
    async fn delete_robot_account(&self, org: &str, name: &str) -> RegistryResult<bool>;
    async fn add_permission(
        &self,
        org: &str,
        repository: &str,
        account: &str,
        is_write: bool,
    ) -> RegistryResult<()>;

    async fn list_notifications(&self, org: &str, repository: &str)
        -> RegistryResult<Vec<Notification>>;
    async fn create_notification(
        &self,
        org: &str,
        repository: &str,
        notification: &Notification,
    ) -> RegistryResult<Notification>;
    async fn update_notification(
        &self,
        org: &str,
        repository: &str,
        uuid: &str,
        notification: &Notification,
    ) -> RegistryResult<Notification>;
    async fn delete_notification(&self, org: &str, repository: &str, uuid: &str)
        -> RegistryResult<bool>;

    /// Creates the team if missing and returns its current members
    async fn ensure_team(&self, org: &str, team: &str) -> RegistryResult<Vec<String>>;
    async fn add_user_to_team(&self, org: &str, team: &str, user: &str) -> RegistryResult<()>;
    async fn remove_user_from_team(&self, org: &str, team: &str, user: &str)
        -> RegistryResult<()>;
    /// Repositories the team already holds a permission on
    async fn list_team_repo_permissions(&self, org: &str, team: &str)
        -> RegistryResult<Vec<String>>;
    async fn add_read_permission_for_team(
        &self,
        org: &str,
        repository: &str,
        team: &str,
    ) -> RegistryResult<()>;
    async fn delete_team(&self, org: &str, team: &str) -> RegistryResult<()>;
}
