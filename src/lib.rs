//! Celgraph is the render-task optimization engine of a 2D animation renderer.
//!
//! The scene layer produces a tree of abstract rendering operations ("tasks"),
//! each with a declared execution-backend capability set and, optionally, a
//! caller-assigned output surface. Celgraph rewrites that tree into an
//! execution-ready DAG bound to concrete backends (software rasterizer or GPU
//! pipeline), inserting and removing pixel-conversion steps and materializing
//! output buffers along the way.
//!
//! # Pipeline overview
//!
//! 1. **Build**: publish [`TaskNode`]s into a [`TaskGraph`] arena
//! 2. **Optimize**: [`Pipeline::optimize`] runs the registered rewrite rules
//!    to a fixpoint, category by category (structural rewrites first, then
//!    allocation)
//! 3. **Execute** (external): per-backend executors walk the optimized DAG via
//!    [`TaskGraph::visit_depth_first`]
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Immutable once published**: rewrites clone nodes and redirect parent
//!   edges; a published node's payload is never mutated in place, which makes
//!   shared sub-trees safe without locks.
//! - **Deterministic**: the rewrite loop is single-threaded, synchronous and
//!   terminating; rules run in a fixed, declared order.
//! - **No silent fallbacks**: backend mismatches always resolve via explicit
//!   conversion nodes or surface as errors, never by guessing.
#![forbid(unsafe_code)]

mod foundation;
mod graph;
mod optimize;

pub use foundation::core::{BlendMode, SurfaceSize};
pub use foundation::error::{CelgraphError, CelgraphResult};
pub use graph::dag::{AllocLimits, TaskGraph};
pub use graph::surface::{BackendKind, Surface, SurfaceId};
pub use graph::task::{BackendAffinity, TaskId, TaskNode, TaskOp};
pub use optimize::driver::{OptimizeStats, OptimizedGraph, Pipeline, PipelineOpts};
pub use optimize::rule::{Optimizer, PassCategory, RewriteOutcome, RuleScope, TaskContext};
pub use optimize::surface_convert::OptimizerSurfaceConvert;
pub use optimize::surface_create::OptimizerSurfaceCreate;

pub use kurbo::{Affine, BezPath};
