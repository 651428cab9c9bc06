//! # dagflow
//!
//! Compiles a directed acyclic graph of computation nodes into a live,
//! concurrently executing dataflow pipeline: one tokio task per node, one
//! single-shot channel per edge of the chosen [EdgeKind]. Callers feed inputs
//! through [Executor::exec] / [Executor::exec_awaitables] and read per-node
//! results through [Awaitable] handles.
//!
//! An executor instance computes exactly one pass. Inputs may arrive split
//! across multiple submission calls; every returned future resolves to the
//! identical node → awaitable map once the pass completes.

pub mod attributes;
pub mod awaitable;
mod compiler;
pub mod error;
pub mod executor;
pub mod graph;
pub mod node;
mod stopper;
#[cfg(test)]
pub(crate) mod testkit;
mod worker;
#[cfg(test)]
mod worker_test;

pub use attributes::NodeAttributes;
pub use awaitable::Awaitable;
pub use error::FlowError;
pub use executor::{Executor, FlowFuture, GraphRef, Options};
pub use graph::{Edge, EdgeKind, GraphQuery, MemGraph};
pub use node::{FlowNode, NodeKey, OperatorFn};
