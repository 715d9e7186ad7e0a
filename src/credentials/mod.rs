// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Robot accounts and the secrets that carry their credentials.

pub mod linking;
pub mod naming;
pub mod robots;
pub mod secrets;

pub use linking::{link_secret, repair_links, unlink_secret, verify_and_fix_links};
pub use robots::{
    delete_robot, expected_robot_name, next_generation_timestamp, provision_access,
    rotate_credentials,
};
pub use secrets::ensure_secret;
