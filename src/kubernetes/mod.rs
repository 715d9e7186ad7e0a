// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery and typed object access.

pub mod crd;
pub mod store;

pub use crd::wait_for_image_repository_crd;
pub use store::{KubeStore, ResourceStore};
