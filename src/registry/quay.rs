// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Quay v1 REST API client

use super::{
    Notification, RegistryError, RegistryResult, RegistryService, Repository, RepositoryRequest,
    RobotAccount,
};
use crate::config::Config;
use crate::types::image_repository::Visibility;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, instrument};

pub struct QuayClient {
    http: reqwest::Client,
    base_url: String,
    token_path: PathBuf,
}

impl std::fmt::Debug for QuayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuayClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Error body shapes returned by Quay
#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Deserialize)]
struct NotificationList {
    #[serde(default)]
    notifications: Vec<Notification>,
}

#[derive(Deserialize)]
struct TeamMember {
    name: String,
}

#[derive(Deserialize)]
struct TeamMembers {
    #[serde(default)]
    members: Vec<TeamMember>,
}

#[derive(Deserialize)]
struct PermissionRepository {
    name: String,
}

#[derive(Deserialize)]
struct TeamPermission {
    repository: PermissionRepository,
}

#[derive(Deserialize)]
struct TeamPermissions {
    #[serde(default)]
    permissions: Vec<TeamPermission>,
}

struct RawResponse {
    status: u16,
    body: String,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn json<T: DeserializeOwned>(&self) -> RegistryResult<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| RegistryError::Unexpected(self.status, format!("invalid body: {}", e)))
    }

    fn into_result(self) -> RegistryResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(classify_error(self.status, &self.body))
        }
    }
}

/// Map a failed Quay response onto the registry error taxonomy
pub(crate) fn classify_error(status: u16, body: &str) -> RegistryError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_message
        .or(parsed.message)
        .or(parsed.detail)
        .unwrap_or_else(|| body.to_string());
    let lower = message.to_lowercase();

    match status {
        402 => RegistryError::PlanLimitExceeded,
        _ if lower.contains("payment required") => RegistryError::PlanLimitExceeded,
        400 if lower.contains("already exists") || lower.contains("existing robot") => {
            RegistryError::AlreadyExists
        }
        404 => RegistryError::NotFound,
        400 => RegistryError::BadRequest(message),
        _ => RegistryError::Unexpected(status, message),
    }
}

fn is_unknown_user(err: &RegistryError) -> bool {
    match err {
        RegistryError::NotFound => true,
        RegistryError::BadRequest(msg) => {
            let msg = msg.to_lowercase();
            msg.contains("does not exist") || msg.contains("not found")
        }
        _ => false,
    }
}

impl QuayClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
            token_path: config.token_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Token is re-read on every call so a rotated token file takes effect immediately
    async fn token(&self) -> RegistryResult<String> {
        tokio::fs::read_to_string(&self.token_path)
            .await
            .map(|t| t.trim().to_string())
            .map_err(|e| {
                RegistryError::Transport(format!(
                    "cannot read token from {}: {}",
                    self.token_path.display(),
                    e
                ))
            })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> RegistryResult<RawResponse> {
        let token = self.token().await?;
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Ok(RawResponse { status, body })
    }

    async fn delete_tolerating_missing(&self, path: &str) -> RegistryResult<bool> {
        let response = self.send(Method::DELETE, path, None).await?;
        match response.status {
            s if (200..300).contains(&s) => Ok(true),
            404 => Ok(false),
            _ => Err(classify_error(response.status, &response.body)),
        }
    }
}

#[async_trait]
impl RegistryService for QuayClient {
    #[instrument(skip(self, request), fields(repository = %request.repository))]
    async fn create_repository(
        &self,
        request: &RepositoryRequest,
    ) -> RegistryResult<Option<Repository>> {
        let body = json!({
            "namespace": request.namespace,
            "repository": request.repository,
            "visibility": request.visibility.as_str(),
            "description": request.description,
            "repo_kind": "image",
        });
        let response = self
            .send(Method::POST, "repository", Some(body))
            .await?
            .into_result()?;

        if response.body.trim().is_empty() {
            return Ok(None);
        }
        response.json().map(Some)
    }

    async fn delete_repository(&self, org: &str, repository: &str) -> RegistryResult<bool> {
        self.delete_tolerating_missing(&format!("repository/{}/{}", org, repository))
            .await
    }

    async fn change_visibility(
        &self,
        org: &str,
        repository: &str,
        visibility: Visibility,
    ) -> RegistryResult<()> {
        self.send(
            Method::POST,
            &format!("repository/{}/{}/changevisibility", org, repository),
            Some(json!({ "visibility": visibility.as_str() })),
        )
        .await?
        .into_result()?;
        Ok(())
    }

    async fn create_robot_account(
        &self,
        org: &str,
        name: &str,
    ) -> RegistryResult<Option<RobotAccount>> {
        let response = self
            .send(
                Method::PUT,
                &format!("organization/{}/robots/{}", org, name),
                Some(json!({})),
            )
            .await?
            .into_result()?;

        if response.body.trim().is_empty() {
            return Ok(None);
        }
        response.json().map(Some)
    }

    async fn get_robot_account(&self, org: &str, name: &str) -> RegistryResult<RobotAccount> {
        self.send(
            Method::GET,
            &format!("organization/{}/robots/{}", org, name),
            None,
        )
        .await?
        .into_result()?
        .json()
    }

    async fn regenerate_token(&self, org: &str, name: &str) -> RegistryResult<RobotAccount> {
        self.send(
            Method::POST,
            &format!("organization/{}/robots/{}/regenerate", org, name),
            None,
        )
        .await?
        .into_result()?
        .json()
    }

    async fn delete_robot_account(&self, org: &str, name: &str) -> RegistryResult<bool> {
        self.delete_tolerating_missing(&format!("organization/{}/robots/{}", org, name))
            .await
    }

    async fn add_permission(
        &self,
        org: &str,
        repository: &str,
        account: &str,
        is_write: bool,
    ) -> RegistryResult<()> {
        let role = if is_write { "write" } else { "read" };
        self.send(
            Method::PUT,
            &format!(
                "repository/{}/{}/permissions/user/{}",
                org, repository, account
            ),
            Some(json!({ "role": role })),
        )
        .await?
        .into_result()?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        org: &str,
        repository: &str,
    ) -> RegistryResult<Vec<Notification>> {
        let list: NotificationList = self
            .send(
                Method::GET,
                &format!("repository/{}/{}/notification/", org, repository),
                None,
            )
            .await?
            .into_result()?
            .json()?;
        Ok(list.notifications)
    }

    async fn create_notification(
        &self,
        org: &str,
        repository: &str,
        notification: &Notification,
    ) -> RegistryResult<Notification> {
        let body = json!({
            "title": notification.title,
            "event": notification.event,
            "method": notification.method,
            "config": notification.config,
            "event_config": {},
        });
        self.send(
            Method::POST,
            &format!("repository/{}/{}/notification/", org, repository),
            Some(body),
        )
        .await?
        .into_result()?
        .json()
    }

    /// Quay has no in-place update, the old notification is replaced
    async fn update_notification(
        &self,
        org: &str,
        repository: &str,
        uuid: &str,
        notification: &Notification,
    ) -> RegistryResult<Notification> {
        self.delete_notification(org, repository, uuid).await?;
        self.create_notification(org, repository, notification).await
    }

    async fn delete_notification(
        &self,
        org: &str,
        repository: &str,
        uuid: &str,
    ) -> RegistryResult<bool> {
        self.delete_tolerating_missing(&format!(
            "repository/{}/{}/notification/{}",
            org, repository, uuid
        ))
        .await
    }

    async fn ensure_team(&self, org: &str, team: &str) -> RegistryResult<Vec<String>> {
        let members = self
            .send(
                Method::GET,
                &format!("organization/{}/team/{}/members", org, team),
                None,
            )
            .await?;

        if members.status == 404 {
            self.send(
                Method::PUT,
                &format!("organization/{}/team/{}", org, team),
                Some(json!({ "role": "member" })),
            )
            .await?
            .into_result()?;
            return Ok(Vec::new());
        }

        let members: TeamMembers = members.into_result()?.json()?;
        Ok(members.members.into_iter().map(|m| m.name).collect())
    }

    async fn add_user_to_team(&self, org: &str, team: &str, user: &str) -> RegistryResult<()> {
        self.send(
            Method::PUT,
            &format!("organization/{}/team/{}/members/{}", org, team, user),
            None,
        )
        .await?
        .into_result()
        .map(|_| ())
        .map_err(|e| {
            if is_unknown_user(&e) {
                RegistryError::UserNotFound(user.to_string())
            } else {
                e
            }
        })
    }

    async fn remove_user_from_team(
        &self,
        org: &str,
        team: &str,
        user: &str,
    ) -> RegistryResult<()> {
        self.delete_tolerating_missing(&format!(
            "organization/{}/team/{}/members/{}",
            org, team, user
        ))
        .await?;
        Ok(())
    }

    async fn list_team_repo_permissions(
        &self,
        org: &str,
        team: &str,
    ) -> RegistryResult<Vec<String>> {
        let permissions: TeamPermissions = self
            .send(
                Method::GET,
                &format!("organization/{}/team/{}/permissions", org, team),
                None,
            )
            .await?
            .into_result()?
            .json()?;
        Ok(permissions
            .permissions
            .into_iter()
            .map(|p| p.repository.name)
            .collect())
    }

    async fn add_read_permission_for_team(
        &self,
        org: &str,
        repository: &str,
        team: &str,
    ) -> RegistryResult<()> {
        self.send(
            Method::PUT,
            &format!(
                "repository/{}/{}/permissions/team/{}",
                org, repository, team
            ),
            Some(json!({ "role": "read" })),
        )
        .await?
        .into_result()?;
        Ok(())
    }

    async fn delete_team(&self, org: &str, team: &str) -> RegistryResult<()> {
        self.delete_tolerating_missing(&format!("organization/{}/team/{}", org, team))
            .await?;
        Ok(())
    }
}
