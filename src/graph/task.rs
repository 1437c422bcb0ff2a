use kurbo::{Affine, BezPath};

use crate::foundation::core::{BlendMode, SurfaceSize};
use crate::graph::surface::{BackendKind, SurfaceId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Identifier for a task published in a [`TaskGraph`](crate::TaskGraph).
pub struct TaskId(pub u32);

#[derive(Clone, Debug)]
/// Operation performed by a task node.
pub enum TaskOp {
    /// Leaf rasterization of vector geometry into the target surface.
    Draw { path: BezPath },
    /// Resample the single operand under an affine transform.
    Transform { transform: Affine },
    /// Composite the operands, in order, into the target surface.
    Blend { mode: BlendMode },
    /// Copy/convert pixel data between backend representations.
    ///
    /// Exactly one operand; synthesized by the optimizer whenever a producer
    /// and a consumer disagree on backend family. Its target surface backend
    /// differs from its operand's target surface backend by construction —
    /// the invariant this node exists to satisfy.
    SurfaceConvert,
}

impl TaskOp {
    /// Short stable name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draw { .. } => "draw",
            Self::Transform { .. } => "transform",
            Self::Blend { .. } => "blend",
            Self::SurfaceConvert => "surface-convert",
        }
    }

    pub fn is_surface_convert(&self) -> bool {
        matches!(self, Self::SurfaceConvert)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Capability set of execution backends a task can legally run on.
///
/// Fixed when the task is constructed by the scene layer (mirroring the
/// per-kind executor registrations upstream); never derived at runtime.
pub struct BackendAffinity {
    software: bool,
    gpu: bool,
}

impl BackendAffinity {
    /// Runs only on the CPU rasterizer.
    pub const SOFTWARE: Self = Self {
        software: true,
        gpu: false,
    };
    /// Runs only on the GPU pipeline.
    pub const GPU: Self = Self {
        software: false,
        gpu: true,
    };
    /// Backend-agnostic: runs anywhere.
    pub const ANY: Self = Self {
        software: true,
        gpu: true,
    };
    /// Satisfiable by no backend. Always a fault when it reaches the
    /// optimizer; constructible so upstream misconfiguration is expressible.
    pub const NONE: Self = Self {
        software: false,
        gpu: false,
    };

    pub fn supports(self, backend: BackendKind) -> bool {
        match backend {
            BackendKind::Software => self.software,
            BackendKind::Gpu => self.gpu,
        }
    }

    pub fn is_empty(self) -> bool {
        !self.software && !self.gpu
    }

    /// The single backend this task is exclusive to, if any.
    ///
    /// Backend-agnostic and empty sets return `None`; agnostic tasks are
    /// never forced into a conversion on their own account.
    pub fn sole_backend(self) -> Option<BackendKind> {
        match (self.software, self.gpu) {
            (true, false) => Some(BackendKind::Software),
            (false, true) => Some(BackendKind::Gpu),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
/// A node in the render operation DAG.
///
/// Freely mutable while being assembled; immutable once published into a
/// [`TaskGraph`](crate::TaskGraph). Rewrites that need to change a published
/// node clone it first and redirect the parent edge to the clone.
pub struct TaskNode {
    /// What the task does.
    pub op: TaskOp,
    /// Which backends it can run on.
    pub affinity: BackendAffinity,
    /// Intrinsic output extent, used to size surfaces allocated for it.
    pub extent: SurfaceSize,
    /// Where the result is written, once assigned.
    pub target: Option<SurfaceId>,
    /// Operands, order-significant. References point "downward" in
    /// evaluation order only.
    pub sub_tasks: Vec<TaskId>,
}

impl TaskNode {
    pub fn new(op: TaskOp, affinity: BackendAffinity, extent: SurfaceSize) -> Self {
        Self {
            op,
            affinity,
            extent,
            target: None,
            sub_tasks: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: SurfaceId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_sub_tasks(mut self, sub_tasks: impl IntoIterator<Item = TaskId>) -> Self {
        self.sub_tasks = sub_tasks.into_iter().collect();
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/task.rs"]
mod tests;
