// src/dag/mod.rs

//! Task graph: the registry of tasks and their sequence/parallel compositions.
//!
//! Compositions nest arbitrarily but always point at names declared before
//! them, so the structure is a DAG by construction.

pub mod graph;

pub use graph::TaskGraph;
