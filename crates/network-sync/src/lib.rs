#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`NetworkSyncError`)
//! - [`config`]: Sync configuration (`NetworkSyncConfig`, builder)
//! - [`event`]: Runtime lifecycle events (`RuntimeEvent`, `RuntimeEventKind`)
//! - [`labels`]: Label policy (scope, desired networks, DNS alias)
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`provisioner`]: Idempotent network creation (`NetworkProvisioner`)
//! - [`reconciler`]: Membership convergence (`MembershipReconciler`)
//! - [`collector`]: Empty managed network removal (`GarbageCollector`)
//! - [`watcher`]: Runtime event subscription (`EventWatcher`)
//! - [`controller`]: Bootstrap and event loop (`SyncController`, `SyncControllerBuilder`)

pub mod collector;
pub mod config;
pub mod controller;
pub mod docker;
pub mod error;
pub mod event;
pub mod labels;
pub mod provisioner;
pub mod reconciler;
pub mod watcher;

// --- Public API Re-exports ---

// Controller (main orchestrator)
pub use controller::{
    BootstrapReport, DispatchOutcome, EventDispatcher, SyncController, SyncControllerBuilder,
};

// Configuration
pub use config::{NetworkSyncConfig, NetworkSyncConfigBuilder};

// Error
pub use error::NetworkSyncError;

// Events
pub use event::{RuntimeEvent, RuntimeEventKind};

// Docker API
pub use docker::{BollardDockerClient, ContainerFilter, DockerClient, NetworkFilter, NetworkSpec};

// Label policy
pub use labels::LabelPolicy;

// Engine components
pub use collector::{CollectReport, GarbageCollector};
pub use provisioner::{NetworkHandle, NetworkProvisioner};
pub use reconciler::{MembershipReconciler, ReconcileReport, SkipReason};
pub use watcher::EventWatcher;
