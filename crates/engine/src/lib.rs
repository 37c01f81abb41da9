#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Reconciliation and transaction orchestration for upkeep
//!
//! This crate keeps an in-memory snapshot of packages and repositories in
//! step with the package-management backend. It tracks outstanding backend
//! transactions, runs reconciliation passes, resolves and submits package
//! actions, and schedules periodic cache refreshes.
//!
//! [`UpdateController`] is the synchronous core; [`ControllerService`] runs
//! it on a tokio task and [`ControllerHandle`] talks to that task.

pub mod controller;
pub mod orchestrator;
pub mod reconcile;
pub mod repos;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod tracker;

pub use controller::UpdateController;
pub use orchestrator::{ApplyRequest, Orchestrator};
pub use reconcile::{PassStage, ReconcilePass};
pub use repos::{EnablePlan, RepoListing};
pub use scheduler::RefreshScheduler;
pub use service::{ControllerHandle, ControllerService, Snapshot};
pub use store::{PackageStore, RepositoryStore};
pub use tracker::{Completion, TransactionTracker};
