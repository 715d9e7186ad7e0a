// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::registry::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Registry error: {0}")]
    RegistryError(#[from] RegistryError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Service account {0} not found")]
    ServiceAccountNotFound(String),

    #[error("Component {0} not found")]
    ComponentNotFound(String),

    #[error("Unexpected registry response: {0}")]
    UnexpectedResponse(String),

    #[error("Object is missing required metadata: {0}")]
    MissingMetadata(String),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
