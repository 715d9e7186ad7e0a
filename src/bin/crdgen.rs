// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Print the ImageRepository CustomResourceDefinition as YAML

use image_controller::types::ImageRepository;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&ImageRepository::crd())?);
    Ok(())
}
