use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{CelgraphError, CelgraphResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Execution backend a surface's pixel data lives on.
///
/// A closed set: compatibility checks pattern-match exhaustively, so adding a
/// backend is a compile-time event, not a runtime discovery.
pub enum BackendKind {
    /// CPU rasterizer memory.
    Software,
    /// GPU pipeline memory.
    Gpu,
}

impl BackendKind {
    /// Whether two backends belong to the same broad backend family.
    ///
    /// Conversion elision is deliberately coarse: any software-capable
    /// surface matches any other software-capable surface, and likewise for
    /// GPU. Future surface subtypes (e.g. tiled vs. linear GPU layouts) stay
    /// within their family here; a finer check would reintroduce conversions
    /// this engine exists to avoid.
    pub fn same_family(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Software, Self::Software) | (Self::Gpu, Self::Gpu)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Identifier for a surface published in a [`TaskGraph`](crate::TaskGraph).
pub struct SurfaceId(pub u32);

#[derive(Clone, Debug)]
/// A backend-tagged 2D pixel buffer declaration.
///
/// Surfaces hold no pixel data here; executors materialize them. The backend
/// tag never changes after construction, and the size is set exactly once
/// before first use.
pub struct Surface {
    backend: BackendKind,
    size: Option<SurfaceSize>,
    is_temporary: bool,
}

impl Surface {
    pub(crate) fn new(backend: BackendKind, size: SurfaceSize, is_temporary: bool) -> Self {
        Self {
            backend,
            size: Some(size),
            is_temporary,
        }
    }

    pub(crate) fn new_deferred(backend: BackendKind) -> Self {
        Self {
            backend,
            size: None,
            is_temporary: false,
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Size, if already assigned. Unsized surfaces are materialized by the
    /// allocation pass before the graph is handed downstream.
    pub fn size(&self) -> Option<SurfaceSize> {
        self.size
    }

    /// True when the surface was synthesized by the optimizer purely to hold
    /// an intermediate result; false for caller-visible outputs.
    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }

    pub(crate) fn set_size(&mut self, size: SurfaceSize) -> CelgraphResult<()> {
        if self.size.is_some() {
            return Err(CelgraphError::structural(
                "surface size is set exactly once before first use",
            ));
        }
        self.size = Some(size);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/surface.rs"]
mod tests;
