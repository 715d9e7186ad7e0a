// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Label keys linking an ImageRepository to a build Component
pub mod labels {
    pub const APPLICATION: &str = "appstudio.redhat.com/application";
    pub const COMPONENT: &str = "appstudio.redhat.com/component";
    /// Marks secrets created by this controller
    pub const INTERNAL_SECRET: &str = "appstudio.redhat.com/internal";
}

/// Kubernetes annotation keys used by the image controller
pub mod annotations {
    /// When set to "true", the image URL is copied to the linked Component
    pub const UPDATE_COMPONENT_IMAGE: &str =
        "image-controller.appstudio.redhat.com/update-component-image";
    /// When set to "true", the remote repository survives ImageRepository deletion
    pub const SKIP_REPOSITORY_DELETION: &str =
        "image-controller.appstudio.redhat.com/skip-repository-deletion";
    /// Legacy JSON options, e.g. `{"visibility":"private"}`
    pub const GENERATE: &str = "image.redhat.com/generate";
}

pub mod finalizers {
    pub const IMAGE_REPOSITORY: &str = "appstudio.openshift.io/image-repository";
    pub const USERS_CONFIG_MAP: &str = "appstudio.openshift.io/quay-team-users";
}

/// Shared allow-list of users granted read access to every repository in a namespace
pub mod users_config_map {
    pub const NAME: &str = "image-controller-additional-users";
    pub const KEY: &str = "quay.io";
}

/// The operator name used for field management
pub const OPERATOR_NAME: &str = "image-controller";

pub const DEFAULT_REPOSITORY_DESCRIPTION: &str = "AppStudio repository for the user";

/// Status messages surfaced to the requester
pub mod messages {
    pub const PLAN_LIMIT_ON_CREATE: &str =
        "Number of private repositories exceeds current quay plan limit";
    pub const PLAN_LIMIT_ON_VISIBILITY: &str =
        "Quay organization plan private repositories limit exceeded";
    /// Leading text of every message about a notification the registry refused
    pub const NOTIFICATION_REJECTED_PREFIX: &str = "notification '";
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Requeue delay after a failed reconciliation
pub const ERROR_REQUEUE_SECS: u64 = 60;
