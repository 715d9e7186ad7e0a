// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object store access used by the reconcilers

use crate::constants::OPERATOR_NAME;
use crate::error::{ControllerError, Result};
use crate::types::{Component, ImageRepository};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use kube::{
    api::{ListParams, Patch, PatchParams, PostParams},
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, instrument};

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_image_repository(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ImageRepository>>;
    async fn list_image_repositories(&self, namespace: &str) -> Result<Vec<ImageRepository>>;
    /// Writes metadata and spec; the returned object carries the new resource version
    async fn replace_image_repository(&self, repo: &ImageRepository) -> Result<ImageRepository>;
    async fn replace_image_repository_status(
        &self,
        repo: &ImageRepository,
    ) -> Result<ImageRepository>;

    async fn get_component(&self, namespace: &str, name: &str) -> Result<Option<Component>>;
    /// Returns `false` when the Component does not exist
    async fn set_component_image(&self, namespace: &str, name: &str, image: &str)
        -> Result<bool>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;
    async fn create_secret(&self, secret: &Secret) -> Result<Secret>;
    async fn replace_secret(&self, secret: &Secret) -> Result<Secret>;

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>>;
    async fn replace_service_account(&self, account: &ServiceAccount) -> Result<ServiceAccount>;

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>>;
    async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap>;
}

/// [`ResourceStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn object_key<K: Resource>(obj: &K) -> Result<(String, String)> {
    let namespace = obj
        .meta()
        .namespace
        .clone()
        .ok_or_else(|| ControllerError::MissingMetadata("namespace".to_string()))?;
    let name = obj
        .meta()
        .name
        .clone()
        .ok_or_else(|| ControllerError::MissingMetadata("name".to_string()))?;
    Ok((namespace, name))
}

async fn replace<K>(api: Api<K>, obj: &K, name: &str) -> Result<K>
where
    K: Resource + Clone + DeserializeOwned + serde::Serialize + Debug,
{
    Ok(api.replace(name, &PostParams::default(), obj).await?)
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_image_repository(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ImageRepository>> {
        Ok(self.api::<ImageRepository>(namespace).get_opt(name).await?)
    }

    #[instrument(skip(self))]
    async fn list_image_repositories(&self, namespace: &str) -> Result<Vec<ImageRepository>> {
        let list = self
            .api::<ImageRepository>(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn replace_image_repository(&self, repo: &ImageRepository) -> Result<ImageRepository> {
        let (namespace, name) = object_key(repo)?;
        debug!("Updating ImageRepository {}/{}", namespace, name);
        replace(self.api(&namespace), repo, &name).await
    }

    async fn replace_image_repository_status(
        &self,
        repo: &ImageRepository,
    ) -> Result<ImageRepository> {
        let (namespace, name) = object_key(repo)?;
        debug!("Updating ImageRepository status {}/{}", namespace, name);
        let data = serde_json::to_vec(repo)?;
        Ok(self
            .api::<ImageRepository>(&namespace)
            .replace_status(&name, &PostParams::default(), data)
            .await?)
    }

    async fn get_component(&self, namespace: &str, name: &str) -> Result<Option<Component>> {
        Ok(self.api::<Component>(namespace).get_opt(name).await?)
    }

    #[instrument(skip(self))]
    async fn set_component_image(
        &self,
        namespace: &str,
        name: &str,
        image: &str,
    ) -> Result<bool> {
        let patch = serde_json::json!({ "spec": { "containerImage": image } });
        let params = PatchParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..Default::default()
        };

        match self
            .api::<Component>(namespace)
            .patch(name, &params, &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self.api::<Secret>(namespace).get_opt(name).await?)
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret> {
        let (namespace, _) = object_key(secret)?;
        Ok(self
            .api::<Secret>(&namespace)
            .create(&PostParams::default(), secret)
            .await?)
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<Secret> {
        let (namespace, name) = object_key(secret)?;
        replace(self.api(&namespace), secret, &name).await
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>> {
        Ok(self.api::<ServiceAccount>(namespace).get_opt(name).await?)
    }

    async fn replace_service_account(&self, account: &ServiceAccount) -> Result<ServiceAccount> {
        let (namespace, name) = object_key(account)?;
        replace(self.api(&namespace), account, &name).await
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        Ok(self.api::<ConfigMap>(namespace).get_opt(name).await?)
    }

    async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        debug!("Updating ConfigMap {}", config_map.name_any());
        let (namespace, name) = object_key(config_map)?;
        replace(self.api(&namespace), config_map, &name).await
    }
}
