//! Controller implementations for Kuscia CRDs
//!
//! Reconciliation is driven by kube-runtime; the provisioning logic itself
//! lives in [`crate::auth`].

mod domain;

pub use domain::{error_policy, reconcile, Context};
