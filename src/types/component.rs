// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The subset of the build Component resource the image controller reads.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "appstudio.redhat.com", version = "v1alpha1", kind = "Component")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(default)]
    pub application: String,
    #[serde(default)]
    pub component_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ComponentSource>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
pub struct ComponentSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSource>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
pub struct GitSource {
    #[serde(default)]
    pub url: String,
}

impl Component {
    /// Git URL the component is built from, if any
    pub fn git_url(&self) -> Option<&str> {
        self.spec
            .source
            .as_ref()
            .and_then(|s| s.git.as_ref())
            .map(|g| g.url.as_str())
            .filter(|url| !url.is_empty())
    }
}
