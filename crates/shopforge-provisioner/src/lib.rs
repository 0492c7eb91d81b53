//! # ShopForge Provisioner
//!
//! The workflow engine of the control plane: drives stores from `queued`
//! through `provisioning` to `ready` or `failed`, tears them down through
//! `deleting` to `deleted`, and converges persisted state with cluster
//! reality after a restart. Per-store mutual exclusion comes from the
//! in-process [`OperationLock`].

pub mod lock;
pub mod provision;
pub mod reconcile;

pub use lock::{OperationKind, OperationLock};
pub use provision::Provisioner;
pub use reconcile::{ReconcileSummary, Reconciler};
