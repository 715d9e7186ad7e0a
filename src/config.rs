// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use url::Url;

const DEFAULT_ORGANIZATION_PATH: &str = "/workspace/organization";
const DEFAULT_TOKEN_PATH: &str = "/workspace/quaytoken";
const DEFAULT_API_URL: &str = "https://quay.io/api/v1";
const DEFAULT_REGISTRY_HOST: &str = "quay.io";
const DEFAULT_PIPELINE_SERVICE_ACCOUNT: &str = "appstudio-pipeline";

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Quay organization owning every repository and robot account
    pub organization: String,
    /// File holding the registry API token, re-read on every request
    pub token_path: PathBuf,
    pub api_url: Url,
    /// Registry host used to form image URLs
    pub registry_host: String,
    /// Service account whose secret list receives push secrets
    pub pipeline_service_account: String,
    /// Restrict reconcilers to a single namespace
    pub watch_namespace: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let organization = match env::var("QUAY_ORGANIZATION") {
            Ok(org) => org,
            Err(_) => {
                let path = env::var("QUAY_ORGANIZATION_PATH")
                    .unwrap_or_else(|_| DEFAULT_ORGANIZATION_PATH.to_string());
                std::fs::read_to_string(&path)
                    .with_context(|| {
                        format!("QUAY_ORGANIZATION not set and {} is not readable", path)
                    })?
                    .trim()
                    .to_string()
            }
        };

        let api_url = env::var("QUAY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_url)
            .with_context(|| format!("QUAY_API_URL is not a valid URL: {}", api_url))?;

        Ok(Config {
            organization,
            token_path: env::var("QUAY_TOKEN_PATH")
                .unwrap_or_else(|_| DEFAULT_TOKEN_PATH.to_string())
                .into(),
            api_url,
            registry_host: env::var("QUAY_REGISTRY_HOST")
                .unwrap_or_else(|_| DEFAULT_REGISTRY_HOST.to_string()),
            pipeline_service_account: env::var("PIPELINE_SERVICE_ACCOUNT")
                .unwrap_or_else(|_| DEFAULT_PIPELINE_SERVICE_ACCOUNT.to_string()),
            watch_namespace: env::var("WATCH_NAMESPACE").ok().filter(|ns| !ns.is_empty()),
        })
    }

    /// Image URL prefix for repositories of the configured organization, e.g. `quay.io/org/`
    pub fn image_url_prefix(&self) -> String {
        format!("{}/{}/", self.registry_host, self.organization)
    }

    pub fn image_url(&self, repository_name: &str) -> String {
        format!("{}{}", self.image_url_prefix(), repository_name)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        organization: "test-org".to_string(),
        token_path: PathBuf::from("/dev/null"),
        api_url: Url::parse(DEFAULT_API_URL).unwrap(),
        registry_host: DEFAULT_REGISTRY_HOST.to_string(),
        pipeline_service_account: DEFAULT_PIPELINE_SERVICE_ACCOUNT.to_string(),
        watch_namespace: None,
    }
}
