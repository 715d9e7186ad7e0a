// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::error::Result;
use crate::types::ImageRepository;
use kube::{discovery::Discovery, Client, Resource};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Wait until the API server serves the ImageRepository CRD.
/// Polls with exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_image_repository_crd(client: &Client) -> Result<()> {
    let api_version = ImageRepository::api_version(&());
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match image_repository_crd_exists(client).await {
            Ok(true) => {
                info!("ImageRepository CRD ({}) is available", api_version);
                return Ok(());
            }
            Ok(false) => {
                info!(
                    "ImageRepository CRD ({}) not yet available, waiting {} seconds...",
                    api_version, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for ImageRepository CRD: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

async fn image_repository_crd_exists(client: &Client) -> Result<bool> {
    let group = ImageRepository::group(&()).to_string();
    let kind = ImageRepository::kind(&()).to_string();
    let version = ImageRepository::version(&()).to_string();
    let discovery = Discovery::new(client.clone())
        .filter(&[group.as_str()])
        .run()
        .await?;

    let found = discovery
        .groups()
        .filter(|g| g.name() == group)
        .flat_map(|g| g.recommended_resources())
        .any(|(ar, _)| ar.kind == kind && ar.version == version);
    Ok(found)
}
