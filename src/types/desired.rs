// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Canonical desired state of an ImageRepository.
//!
//! An ImageRepository can express its wishes either through the typed spec or
//! through the legacy `image.redhat.com/generate` annotation. Both are parsed
//! into one [`DesiredRepository`] before the state machine looks at them.

use crate::constants::annotations;
use crate::error::{ControllerError, Result};
use crate::types::image_repository::{ImageParameters, ImageRepository, NotificationSpec, Visibility};
use kube::ResourceExt;
use serde::Deserialize;
use tracing::warn;

/// Options understood by the legacy generate annotation
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    #[serde(default)]
    pub visibility: Option<String>,
}

/// Where the repository parameters came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepositorySource {
    Typed(ImageParameters),
    LegacyAnnotation(GenerateOptions),
}

impl RepositorySource {
    /// Typed spec wins whenever it carries a visibility or no legacy annotation is present
    pub fn from_resource(repo: &ImageRepository) -> Self {
        if repo.spec.image.visibility.is_some() {
            return RepositorySource::Typed(repo.spec.image.clone());
        }

        match repo.annotations().get(annotations::GENERATE) {
            Some(raw) => match serde_json::from_str::<GenerateOptions>(raw) {
                Ok(opts) => RepositorySource::LegacyAnnotation(opts),
                Err(e) => {
                    warn!(
                        "Ignoring malformed {} annotation on {}: {}",
                        annotations::GENERATE,
                        repo.name_any(),
                        e
                    );
                    RepositorySource::Typed(repo.spec.image.clone())
                }
            },
            None => RepositorySource::Typed(repo.spec.image.clone()),
        }
    }

    fn visibility(&self) -> Option<Visibility> {
        match self {
            RepositorySource::Typed(params) => params.visibility,
            RepositorySource::LegacyAnnotation(opts) => {
                opts.visibility.as_deref().and_then(Visibility::parse)
            }
        }
    }
}

/// Application and component labels of a component-linked repository
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentLink {
    pub application: String,
    pub component: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredRepository {
    pub namespace: String,
    pub object_name: String,
    pub uid: Option<String>,
    /// Fully derived `<namespace>/<name>` repository name
    pub name: String,
    /// Requested visibility, `None` when the requester left it empty
    pub visibility: Option<Visibility>,
    pub description: Option<String>,
    pub notifications: Vec<NotificationSpec>,
    pub regenerate_token: bool,
    pub verify_linking: bool,
    pub link: Option<ComponentLink>,
    pub update_component_image: bool,
    pub skip_repository_deletion: bool,
}

impl DesiredRepository {
    pub fn from_resource(repo: &ImageRepository) -> Result<Self> {
        let namespace = repo
            .namespace()
            .ok_or_else(|| ControllerError::MissingMetadata("namespace".to_string()))?;
        let object_name = repo.name_any();
        let source = RepositorySource::from_resource(repo);

        let link = match (repo.application_name(), repo.component_name()) {
            (Some(application), Some(component)) => Some(ComponentLink {
                application: application.to_string(),
                component: component.to_string(),
            }),
            _ => None,
        };

        let name = derive_repository_name(
            &namespace,
            &object_name,
            &repo.spec.image.name,
            link.as_ref(),
        );
        let credentials = repo.spec.credentials.clone().unwrap_or_default();

        Ok(DesiredRepository {
            visibility: source.visibility(),
            namespace,
            object_name,
            uid: repo.uid(),
            name,
            description: repo
                .spec
                .image
                .description
                .clone()
                .filter(|d| !d.is_empty()),
            notifications: repo.spec.notifications.clone().unwrap_or_default(),
            regenerate_token: credentials.regenerate_token.unwrap_or(false),
            verify_linking: credentials.verify_linking.unwrap_or(false),
            link,
            update_component_image: repo.wants_component_image_update(),
            skip_repository_deletion: repo
                .annotation_is_true(annotations::SKIP_REPOSITORY_DELETION),
        })
    }

    pub fn is_component_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Visibility used when creating the repository
    pub fn visibility_or_default(&self) -> Visibility {
        self.visibility.unwrap_or(Visibility::Public)
    }

    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.object_name)
    }
}

/// Resolve the registry repository name.
///
/// Explicit name > component name > object name, always prefixed with the namespace.
pub fn derive_repository_name(
    namespace: &str,
    object_name: &str,
    explicit: &str,
    link: Option<&ComponentLink>,
) -> String {
    let explicit = explicit.trim().trim_start_matches('/');
    if !explicit.is_empty() {
        let prefix = format!("{}/", namespace);
        if explicit.starts_with(&prefix) {
            return explicit.to_string();
        }
        return format!("{}{}", prefix, explicit);
    }

    match link {
        Some(link) => format!("{}/{}", namespace, link.component),
        None => format!("{}/{}", namespace, object_name),
    }
}
