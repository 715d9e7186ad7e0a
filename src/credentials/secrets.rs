// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Materialization of robot credentials as image pull secrets

use crate::constants::labels;
use crate::error::Result;
use crate::kubernetes::ResourceStore;
use crate::types::ImageRepository;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::{info, instrument};

pub const DOCKER_CONFIG_KEY: &str = ".dockerconfigjson";
pub const DOCKER_CONFIG_TYPE: &str = "kubernetes.io/dockerconfigjson";

/// `{"auths":{"<image-url>":{"auth":"<base64(name:token)>"}}}`
pub fn docker_config_payload(image_url: &str, robot_name: &str, token: &str) -> String {
    let auth = STANDARD.encode(format!("{}:{}", robot_name, token));
    let mut auths = serde_json::Map::new();
    auths.insert(image_url.to_string(), serde_json::json!({ "auth": auth }));
    serde_json::json!({ "auths": auths }).to_string()
}

/// Build the secret for a robot account, owned by the ImageRepository
pub fn build_secret(owner: &ImageRepository, name: &str, payload: String) -> Secret {
    let mut secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: owner.namespace(),
            ..Default::default()
        },
        ..Default::default()
    };
    apply_payload(&mut secret, owner, payload);
    secret
}

fn apply_payload(secret: &mut Secret, owner: &ImageRepository, payload: String) {
    secret
        .labels_mut()
        .insert(labels::INTERNAL_SECRET.to_string(), "true".to_string());

    if let Some(owner_ref) = owner.owner_ref(&()) {
        let refs = secret.owner_references_mut();
        if !refs.iter().any(|r| r.uid == owner_ref.uid) {
            refs.push(owner_ref);
        }
    }

    secret.type_ = Some(DOCKER_CONFIG_TYPE.to_string());
    secret.string_data = None;
    secret.data = Some(BTreeMap::from([(
        DOCKER_CONFIG_KEY.to_string(),
        ByteString(payload.into_bytes()),
    )]));
}

/// Create the secret, or overwrite the payload of an existing one
#[instrument(skip(store, owner, token), fields(repository = %owner.name_any()))]
pub async fn ensure_secret(
    store: &dyn ResourceStore,
    owner: &ImageRepository,
    secret_name: &str,
    robot_name: &str,
    token: &str,
    image_url: &str,
) -> Result<()> {
    let namespace = owner.namespace().unwrap_or_default();
    let payload = docker_config_payload(image_url, robot_name, token);

    match store.get_secret(&namespace, secret_name).await? {
        None => {
            info!("Creating secret {}/{}", namespace, secret_name);
            store
                .create_secret(&build_secret(owner, secret_name, payload))
                .await?;
        }
        Some(mut existing) => {
            info!("Updating secret {}/{}", namespace, secret_name);
            apply_payload(&mut existing, owner, payload);
            store.replace_secret(&existing).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn decode_auth(secret: &Secret) -> Option<(String, String)> {
    let data = secret.data.as_ref()?.get(DOCKER_CONFIG_KEY)?;
    let config: serde_json::Value = serde_json::from_slice(&data.0).ok()?;
    let (url, entry) = config["auths"].as_object()?.iter().next()?;
    let auth = STANDARD.decode(entry["auth"].as_str()?).ok()?;
    Some((url.clone(), String::from_utf8(auth).ok()?))
}
