// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test doubles: a mock Kubernetes API endpoint plus in-memory registry and object store.

use crate::error::{ControllerError, Result};
use crate::kubernetes::ResourceStore;
use crate::registry::{
    Notification, RegistryError, RegistryResult, RegistryService, Repository, RepositoryRequest,
    RobotAccount,
};
use crate::types::{Component, ImageRepository, Visibility};
use async_trait::async_trait;
use chrono::Utc;
use http::{Request, Response};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::error::ErrorResponse;
use kube::{Client, Resource, ResourceExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut Context<'_>,
    ) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("resource", &path)));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

pub fn make_service_account(namespace: &str, name: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn api_error(code: u16, reason: &str, message: String) -> ControllerError {
    ControllerError::KubeError(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

type Key = (String, String);

fn key_of<K: Resource>(obj: &K) -> Key {
    (
        obj.meta().namespace.clone().unwrap_or_default(),
        obj.meta().name.clone().unwrap_or_default(),
    )
}

#[derive(Default)]
struct StoreState {
    repositories: BTreeMap<Key, ImageRepository>,
    components: BTreeMap<Key, Component>,
    secrets: BTreeMap<Key, Secret>,
    service_accounts: BTreeMap<Key, ServiceAccount>,
    config_maps: BTreeMap<Key, ConfigMap>,
    version: u64,
    failures: HashSet<String>,
    calls: Vec<String>,
}

impl StoreState {
    fn next_version(&mut self) -> Option<String> {
        self.version += 1;
        Some(self.version.to_string())
    }

    fn enter(&mut self, op: &str) -> Result<()> {
        self.calls.push(op.to_string());
        if self.failures.contains(op) {
            return Err(api_error(500, "InternalError", format!("{} failed", op)));
        }
        Ok(())
    }
}

/// Rejects a write whose resource version is stale
fn check_version(stored: &ObjectMeta, incoming: &ObjectMeta) -> Result<()> {
    match (&stored.resource_version, &incoming.resource_version) {
        (Some(s), Some(i)) if s != i => Err(api_error(
            409,
            "Conflict",
            format!("the object {:?} has been modified", incoming.name),
        )),
        _ => Ok(()),
    }
}

/// In-memory object store with finalizer and optimistic concurrency semantics
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<StoreState>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &str) {
        self.state.lock().unwrap().failures.insert(op.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == op)
            .count()
    }

    pub fn insert_image_repository(&self, mut repo: ImageRepository) {
        let mut state = self.state.lock().unwrap();
        repo.metadata.resource_version = state.next_version();
        state.repositories.insert(key_of(&repo), repo);
    }

    pub fn image_repository(&self, namespace: &str, name: &str) -> Option<ImageRepository> {
        self.state
            .lock()
            .unwrap()
            .repositories
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Mark for deletion, or remove right away when no finalizer is set
    pub fn request_deletion(&self, namespace: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        let key = (namespace.to_string(), name.to_string());
        let Some(repo) = state.repositories.get_mut(&key) else {
            return;
        };
        if repo.finalizers().is_empty() {
            state.repositories.remove(&key);
            return;
        }
        repo.metadata.deletion_timestamp = Some(Time(Utc::now()));
    }

    pub fn insert_component(&self, component: Component) {
        let mut state = self.state.lock().unwrap();
        state.components.insert(key_of(&component), component);
    }

    pub fn component(&self, namespace: &str, name: &str) -> Option<Component> {
        self.state
            .lock()
            .unwrap()
            .components
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn insert_secret(&self, secret: Secret) {
        let mut state = self.state.lock().unwrap();
        state.secrets.insert(key_of(&secret), secret);
    }

    pub fn remove_secret(&self, namespace: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .secrets
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn secret_count(&self) -> usize {
        self.state.lock().unwrap().secrets.len()
    }

    pub fn insert_service_account(&self, account: ServiceAccount) {
        let mut state = self.state.lock().unwrap();
        state.service_accounts.insert(key_of(&account), account);
    }

    pub fn service_account(&self, namespace: &str, name: &str) -> Option<ServiceAccount> {
        self.state
            .lock()
            .unwrap()
            .service_accounts
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn insert_config_map(&self, mut config_map: ConfigMap) {
        let mut state = self.state.lock().unwrap();
        config_map.metadata.resource_version = state.next_version();
        state.config_maps.insert(key_of(&config_map), config_map);
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.state
            .lock()
            .unwrap()
            .config_maps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn get_image_repository(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ImageRepository>> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_image_repository")?;
        Ok(state
            .repositories
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_image_repositories(&self, namespace: &str) -> Result<Vec<ImageRepository>> {
        let mut state = self.state.lock().unwrap();
        state.enter("list_image_repositories")?;
        Ok(state
            .repositories
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn replace_image_repository(&self, repo: &ImageRepository) -> Result<ImageRepository> {
        let mut state = self.state.lock().unwrap();
        state.enter("replace_image_repository")?;
        let key = key_of(repo);
        let stored = state
            .repositories
            .get(&key)
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound", format!("{:?} not found", key)))?;
        check_version(&stored.metadata, &repo.metadata)?;

        let mut updated = repo.clone();
        updated.status = stored.status;
        updated.metadata.deletion_timestamp = stored.metadata.deletion_timestamp;
        updated.metadata.resource_version = state.next_version();

        if updated.metadata.deletion_timestamp.is_some() && updated.finalizers().is_empty() {
            state.repositories.remove(&key);
        } else {
            state.repositories.insert(key, updated.clone());
        }
        Ok(updated)
    }

    async fn replace_image_repository_status(
        &self,
        repo: &ImageRepository,
    ) -> Result<ImageRepository> {
        let mut state = self.state.lock().unwrap();
        state.enter("replace_image_repository_status")?;
        let key = key_of(repo);
        let mut stored = state
            .repositories
            .get(&key)
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound", format!("{:?} not found", key)))?;
        check_version(&stored.metadata, &repo.metadata)?;

        stored.status = repo.status.clone();
        stored.metadata.resource_version = state.next_version();
        state.repositories.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get_component(&self, namespace: &str, name: &str) -> Result<Option<Component>> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_component")?;
        Ok(state
            .components
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn set_component_image(
        &self,
        namespace: &str,
        name: &str,
        image: &str,
    ) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.enter("set_component_image")?;
        match state
            .components
            .get_mut(&(namespace.to_string(), name.to_string()))
        {
            Some(component) => {
                component.spec.container_image = Some(image.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_secret")?;
        Ok(state
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret> {
        let mut state = self.state.lock().unwrap();
        state.enter("create_secret")?;
        let key = key_of(secret);
        if state.secrets.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists", format!("{:?} exists", key)));
        }
        let mut created = secret.clone();
        created.metadata.resource_version = state.next_version();
        state.secrets.insert(key, created.clone());
        Ok(created)
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<Secret> {
        let mut state = self.state.lock().unwrap();
        state.enter("replace_secret")?;
        let key = key_of(secret);
        let stored = state
            .secrets
            .get(&key)
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound", format!("{:?} not found", key)))?;
        check_version(&stored.metadata, &secret.metadata)?;
        let mut updated = secret.clone();
        updated.metadata.resource_version = state.next_version();
        state.secrets.insert(key, updated.clone());
        Ok(updated)
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_service_account")?;
        Ok(state
            .service_accounts
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn replace_service_account(&self, account: &ServiceAccount) -> Result<ServiceAccount> {
        let mut state = self.state.lock().unwrap();
        state.enter("replace_service_account")?;
        let key = key_of(account);
        let stored = state
            .service_accounts
            .get(&key)
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound", format!("{:?} not found", key)))?;
        check_version(&stored.metadata, &account.metadata)?;
        let mut updated = account.clone();
        updated.metadata.resource_version = state.next_version();
        state.service_accounts.insert(key, updated.clone());
        Ok(updated)
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_config_map")?;
        Ok(state
            .config_maps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn replace_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        let mut state = self.state.lock().unwrap();
        state.enter("replace_config_map")?;
        let key = key_of(config_map);
        let stored = state
            .config_maps
            .get(&key)
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound", format!("{:?} not found", key)))?;
        check_version(&stored.metadata, &config_map.metadata)?;

        let mut updated = config_map.clone();
        updated.metadata.deletion_timestamp = stored.metadata.deletion_timestamp;
        updated.metadata.resource_version = state.next_version();
        if updated.metadata.deletion_timestamp.is_some() && updated.finalizers().is_empty() {
            state.config_maps.remove(&key);
        } else {
            state.config_maps.insert(key, updated.clone());
        }
        Ok(updated)
    }
}

#[derive(Default)]
struct RegistryState {
    repositories: BTreeMap<String, Visibility>,
    /// Short robot name to current token
    robots: BTreeMap<String, String>,
    /// Short robot name to (repository, is_write)
    permissions: BTreeMap<String, (String, bool)>,
    notifications: BTreeMap<String, Vec<Notification>>,
    teams: BTreeMap<String, Vec<String>>,
    team_permissions: BTreeMap<String, Vec<String>>,
    unknown_users: HashSet<String>,
    /// Operation to (calls still allowed to succeed, error returned afterwards)
    failures: HashMap<String, (usize, RegistryError)>,
    calls: Vec<String>,
    counter: u64,
}

impl RegistryState {
    fn enter(&mut self, op: &str) -> RegistryResult<()> {
        self.calls.push(op.to_string());
        match self.failures.get_mut(op) {
            Some((0, err)) => Err(err.clone()),
            Some((allowed, _)) => {
                *allowed -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}-{}", prefix, self.counter)
    }
}

/// In-memory registry recording every call it receives
#[derive(Clone)]
pub struct FakeRegistry {
    org: String,
    state: Arc<Mutex<RegistryState>>,
}

impl FakeRegistry {
    pub fn new(org: &str) -> Self {
        Self {
            org: org.to_string(),
            state: Arc::new(Mutex::new(RegistryState::default())),
        }
    }

    fn full_name(&self, short: &str) -> String {
        format!("{}+{}", self.org, short)
    }

    fn short_name<'a>(&self, name: &'a str) -> &'a str {
        name.split_once('+').map(|(_, s)| s).unwrap_or(name)
    }

    /// Fail every call of `op` with a server error
    pub fn fail_on(&self, op: &str) {
        self.fail_with(op, RegistryError::Unexpected(500, format!("{} failed", op)));
    }

    pub fn fail_with(&self, op: &str, err: RegistryError) {
        self.fail_after(op, 0, err);
    }

    /// Let the first `allowed` calls of `op` succeed, then fail with `err`
    pub fn fail_after(&self, op: &str, allowed: usize, err: RegistryError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op.to_string(), (allowed, err));
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == op)
            .count()
    }

    pub fn has_repository(&self, name: &str) -> bool {
        self.state.lock().unwrap().repositories.contains_key(name)
    }

    pub fn repository_visibility(&self, name: &str) -> Option<Visibility> {
        self.state.lock().unwrap().repositories.get(name).copied()
    }

    pub fn robot_count(&self) -> usize {
        self.state.lock().unwrap().robots.len()
    }

    pub fn robot_names(&self) -> Vec<String> {
        self.state.lock().unwrap().robots.keys().cloned().collect()
    }

    pub fn token_of(&self, short_name: &str) -> Option<String> {
        self.state.lock().unwrap().robots.get(short_name).cloned()
    }

    pub fn permission_of(&self, short_name: &str) -> Option<(String, bool)> {
        self.state
            .lock()
            .unwrap()
            .permissions
            .get(short_name)
            .cloned()
    }

    pub fn seed_notification(&self, repository: &str, notification: Notification) {
        self.state
            .lock()
            .unwrap()
            .notifications
            .entry(repository.to_string())
            .or_default()
            .push(notification);
    }

    pub fn notifications_of(&self, repository: &str) -> Vec<Notification> {
        self.state
            .lock()
            .unwrap()
            .notifications
            .get(repository)
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed_team_member(&self, team: &str, user: &str) {
        self.state
            .lock()
            .unwrap()
            .teams
            .entry(team.to_string())
            .or_default()
            .push(user.to_string());
    }

    pub fn seed_team_permission(&self, team: &str, repository: &str) {
        self.state
            .lock()
            .unwrap()
            .team_permissions
            .entry(team.to_string())
            .or_default()
            .push(repository.to_string());
    }

    pub fn team_exists(&self, team: &str) -> bool {
        self.state.lock().unwrap().teams.contains_key(team)
    }

    pub fn team_members(&self, team: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .teams
            .get(team)
            .cloned()
            .unwrap_or_default()
    }

    pub fn team_permissions(&self, team: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .team_permissions
            .get(team)
            .cloned()
            .unwrap_or_default()
    }

    pub fn mark_unknown_user(&self, user: &str) {
        self.state
            .lock()
            .unwrap()
            .unknown_users
            .insert(user.to_string());
    }
}

#[async_trait]
impl RegistryService for FakeRegistry {
    async fn create_repository(
        &self,
        request: &RepositoryRequest,
    ) -> RegistryResult<Option<Repository>> {
        let mut state = self.state.lock().unwrap();
        state.enter("create_repository")?;
        if state.repositories.contains_key(&request.repository) {
            return Err(RegistryError::AlreadyExists);
        }
        state
            .repositories
            .insert(request.repository.clone(), request.visibility);
        Ok(Some(Repository {
            namespace: request.namespace.clone(),
            name: request.repository.clone(),
        }))
    }

    async fn delete_repository(&self, _org: &str, repository: &str) -> RegistryResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.enter("delete_repository")?;
        state.notifications.remove(repository);
        Ok(state.repositories.remove(repository).is_some())
    }

    async fn change_visibility(
        &self,
        _org: &str,
        repository: &str,
        visibility: Visibility,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("change_visibility")?;
        match state.repositories.get_mut(repository) {
            Some(v) => {
                *v = visibility;
                Ok(())
            }
            None => Err(RegistryError::NotFound),
        }
    }

    async fn create_robot_account(
        &self,
        _org: &str,
        name: &str,
    ) -> RegistryResult<Option<RobotAccount>> {
        let mut state = self.state.lock().unwrap();
        state.enter("create_robot_account")?;
        if state.robots.contains_key(name) {
            return Err(RegistryError::AlreadyExists);
        }
        let token = state.next_id("token");
        state.robots.insert(name.to_string(), token.clone());
        Ok(Some(RobotAccount {
            name: self.full_name(name),
            token,
        }))
    }

    async fn get_robot_account(&self, _org: &str, name: &str) -> RegistryResult<RobotAccount> {
        let mut state = self.state.lock().unwrap();
        state.enter("get_robot_account")?;
        let short = self.short_name(name);
        let token = state
            .robots
            .get(short)
            .cloned()
            .ok_or(RegistryError::NotFound)?;
        Ok(RobotAccount {
            name: self.full_name(short),
            token,
        })
    }

    async fn regenerate_token(&self, _org: &str, name: &str) -> RegistryResult<RobotAccount> {
        let mut state = self.state.lock().unwrap();
        state.enter("regenerate_token")?;
        let short = self.short_name(name).to_string();
        if !state.robots.contains_key(&short) {
            return Err(RegistryError::NotFound);
        }
        let token = state.next_id("token");
        state.robots.insert(short.clone(), token.clone());
        Ok(RobotAccount {
            name: self.full_name(&short),
            token,
        })
    }

    async fn delete_robot_account(&self, _org: &str, name: &str) -> RegistryResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.enter("delete_robot_account")?;
        let short = self.short_name(name).to_string();
        state.permissions.remove(&short);
        Ok(state.robots.remove(&short).is_some())
    }

    async fn add_permission(
        &self,
        _org: &str,
        repository: &str,
        account: &str,
        is_write: bool,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("add_permission")?;
        let short = self.short_name(account).to_string();
        state
            .permissions
            .insert(short, (repository.to_string(), is_write));
        Ok(())
    }

    async fn list_notifications(
        &self,
        _org: &str,
        repository: &str,
    ) -> RegistryResult<Vec<Notification>> {
        let mut state = self.state.lock().unwrap();
        state.enter("list_notifications")?;
        Ok(state
            .notifications
            .get(repository)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_notification(
        &self,
        _org: &str,
        repository: &str,
        notification: &Notification,
    ) -> RegistryResult<Notification> {
        let mut state = self.state.lock().unwrap();
        state.enter("create_notification")?;
        let mut created = notification.clone();
        created.uuid = state.next_id("uuid");
        state
            .notifications
            .entry(repository.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_notification(
        &self,
        _org: &str,
        repository: &str,
        uuid: &str,
        notification: &Notification,
    ) -> RegistryResult<Notification> {
        let mut state = self.state.lock().unwrap();
        state.enter("update_notification")?;
        let existing = state
            .notifications
            .get_mut(repository)
            .and_then(|list| list.iter_mut().find(|n| n.uuid == uuid))
            .ok_or(RegistryError::NotFound)?;
        *existing = Notification {
            uuid: uuid.to_string(),
            ..notification.clone()
        };
        Ok(existing.clone())
    }

    async fn delete_notification(
        &self,
        _org: &str,
        repository: &str,
        uuid: &str,
    ) -> RegistryResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.enter("delete_notification")?;
        let Some(list) = state.notifications.get_mut(repository) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|n| n.uuid != uuid);
        Ok(list.len() != before)
    }

    async fn ensure_team(&self, _org: &str, team: &str) -> RegistryResult<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.enter("ensure_team")?;
        Ok(state.teams.entry(team.to_string()).or_default().clone())
    }

    async fn add_user_to_team(&self, _org: &str, team: &str, user: &str) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("add_user_to_team")?;
        if state.unknown_users.contains(user) {
            return Err(RegistryError::UserNotFound(user.to_string()));
        }
        let members = state.teams.entry(team.to_string()).or_default();
        if !members.iter().any(|m| m == user) {
            members.push(user.to_string());
        }
        Ok(())
    }

    async fn remove_user_from_team(
        &self,
        _org: &str,
        team: &str,
        user: &str,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("remove_user_from_team")?;
        if let Some(members) = state.teams.get_mut(team) {
            members.retain(|m| m != user);
        }
        Ok(())
    }

    async fn list_team_repo_permissions(
        &self,
        _org: &str,
        team: &str,
    ) -> RegistryResult<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.enter("list_team_repo_permissions")?;
        Ok(state
            .team_permissions
            .get(team)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_read_permission_for_team(
        &self,
        _org: &str,
        repository: &str,
        team: &str,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("add_read_permission_for_team")?;
        let granted = state.team_permissions.entry(team.to_string()).or_default();
        if !granted.iter().any(|r| r == repository) {
            granted.push(repository.to_string());
        }
        Ok(())
    }

    async fn delete_team(&self, _org: &str, team: &str) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter("delete_team")?;
        state.teams.remove(team);
        state.team_permissions.remove(team);
        Ok(())
    }
}
