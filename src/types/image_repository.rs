// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{annotations, finalizers, labels};
use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "appstudio.redhat.com", version = "v1alpha1", kind = "ImageRepository")]
#[kube(namespaced)]
#[kube(status = "ImageRepositoryStatus")]
#[kube(shortname = "imagerepo")]
#[serde(rename_all = "camelCase")]
pub struct ImageRepositorySpec {
    #[serde(default)]
    pub image: ImageParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialsRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<NotificationSpec>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageParameters {
    /// Repository name in the registry, `<namespace>/<name>` once provisioned
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-shot requests; the controller clears each flag once served
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
pub struct CredentialsRequest {
    #[serde(
        rename = "regenerate-token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub regenerate_token: Option<bool>,
    #[serde(
        rename = "verify-linking",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub verify_linking: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub struct NotificationSpec {
    pub title: String,
    pub event: NotificationEvent,
    pub method: NotificationMethod,
    #[serde(default)]
    pub config: NotificationConfig,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    RepoPush,
    BuildQueued,
    BuildStart,
    BuildSuccess,
    BuildFailure,
    BuildCancelled,
    VulnerabilityFound,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::RepoPush => "repo_push",
            NotificationEvent::BuildQueued => "build_queued",
            NotificationEvent::BuildStart => "build_start",
            NotificationEvent::BuildSuccess => "build_success",
            NotificationEvent::BuildFailure => "build_failure",
            NotificationEvent::BuildCancelled => "build_cancelled",
            NotificationEvent::VulnerabilityFound => "vulnerability_found",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMethod {
    Email,
    Webhook,
}

impl NotificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationMethod::Email => "email",
            NotificationMethod::Webhook => "webhook",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash, schemars::JsonSchema)]
pub struct NotificationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryState {
    Ready,
    Failed,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRepositoryStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RepositoryState>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default)]
    pub image: ImageStatus,
    #[serde(default)]
    pub credentials: CredentialsStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<NotificationStatus>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub push_robot_account_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub push_secret_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pull_robot_account_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pull_secret_name: String,
}

/// Notification as observed in the registry after the last sync
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
pub struct NotificationStatus {
    pub title: String,
    pub event: String,
    pub method: String,
    #[serde(default)]
    pub config: NotificationConfig,
    #[serde(rename = "uuid", default)]
    pub uuid: String,
}

/// Robot account and secret belonging to one access level
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessCredentials {
    pub robot_account_name: String,
    pub secret_name: String,
}

impl ImageRepository {
    pub fn status_or_default(&self) -> ImageRepositoryStatus {
        self.status.clone().unwrap_or_default()
    }

    pub fn state(&self) -> Option<RepositoryState> {
        self.status.as_ref().and_then(|s| s.state)
    }

    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self) -> bool {
        self.finalizers()
            .iter()
            .any(|f| f == finalizers::IMAGE_REPOSITORY)
    }

    pub fn add_finalizer(&mut self) {
        if !self.has_finalizer() {
            self.finalizers_mut()
                .push(finalizers::IMAGE_REPOSITORY.to_string());
        }
    }

    pub fn remove_finalizer(&mut self) {
        self.finalizers_mut()
            .retain(|f| f != finalizers::IMAGE_REPOSITORY);
    }

    pub fn application_name(&self) -> Option<&str> {
        self.labels()
            .get(labels::APPLICATION)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn component_name(&self) -> Option<&str> {
        self.labels()
            .get(labels::COMPONENT)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Both application and component labels are set
    pub fn is_component_linked(&self) -> bool {
        self.application_name().is_some() && self.component_name().is_some()
    }

    pub fn annotation_is_true(&self, key: &str) -> bool {
        self.annotations().get(key).is_some_and(|v| v == "true")
    }

    pub fn wants_component_image_update(&self) -> bool {
        self.annotation_is_true(annotations::UPDATE_COMPONENT_IMAGE)
    }

    pub fn image_url(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.image.url.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) fn make_image_repository(namespace: &str, name: &str) -> ImageRepository {
    let mut repo = ImageRepository::new(name, ImageRepositorySpec::default());
    repo.metadata.namespace = Some(namespace.to_string());
    repo.metadata.uid = Some(format!("uid-{}-{}", namespace, name));
    repo
}
