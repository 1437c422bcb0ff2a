use crate::foundation::error::{CelgraphError, CelgraphResult};

/// Pixel dimensions of a render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> CelgraphResult<Self> {
        if width == 0 || height == 0 {
            return Err(CelgraphError::structural(
                "SurfaceSize dimensions must be > 0",
            ));
        }
        Ok(Self { width, height })
    }

    /// Byte footprint of an RGBA8 buffer of this size.
    pub fn byte_len(self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * 4
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Compositing mode carried by blend tasks.
///
/// The blend formula itself is the executors' concern; the optimizer only
/// routes the operands.
pub enum BlendMode {
    /// Standard "source over destination" (premultiplied alpha).
    Normal,
    /// Additive accumulation.
    Add,
    /// Multiply source and destination.
    Multiply,
}
