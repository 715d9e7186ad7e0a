// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use image_controller::config::Config;
use image_controller::kubernetes::{wait_for_image_repository_crd, KubeStore};
use image_controller::reconcilers::{Context, ImageRepositoryReconciler, UsersConfigMapReconciler};
use image_controller::registry::quay::QuayClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting image controller");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: organization={}, registry={}, watch_namespace={:?}",
        config.organization, config.registry_host, config.watch_namespace
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for ImageRepository CRD to become available...");
    wait_for_image_repository_crd(&client).await?;

    let registry = QuayClient::new(&config)?;
    let store = KubeStore::new(client.clone());
    let context = Arc::new(Context::new(Arc::new(registry), Arc::new(store), config));

    let repository_reconciler = ImageRepositoryReconciler::new(client.clone(), context.clone());
    let users_reconciler = UsersConfigMapReconciler::new(client, context);

    info!("Starting reconcilers...");
    tokio::try_join!(repository_reconciler.run(), users_reconciler.run())?;

    warn!("All reconcilers stopped unexpectedly");
    Ok(())
}
