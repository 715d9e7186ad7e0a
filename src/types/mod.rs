// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod component;
pub mod desired;
pub mod image_repository;

pub use component::{Component, ComponentSpec};
pub use desired::{ComponentLink, DesiredRepository};
pub use image_repository::{
    ImageRepository, ImageRepositorySpec, ImageRepositoryStatus, NotificationSpec,
    NotificationStatus, RepositoryState, Visibility,
};
