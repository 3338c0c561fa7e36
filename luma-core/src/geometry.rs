//! Stream geometry: the width/height pair describing every frame in
//! a session.
//!
//! Geometry is announced exactly once per stream session by the
//! `initial` control message. A *new* geometry is a reinitialization
//! event (queue reset + surface rebuild), never an in-place resize.

use crate::error::LumaError;

/// Validated frame dimensions for the active stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    width: u32,
    height: u32,
}

impl Geometry {
    /// Construct a geometry, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, LumaError> {
        if width == 0 || height == 0 {
            return Err(LumaError::InvalidGeometry { width, height });
        }
        Ok(Self { width, height })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Chroma plane width: `ceil(width / 2)`.
    pub fn chroma_width(&self) -> u32 {
        self.width.div_ceil(2)
    }

    /// Chroma plane height: `ceil(height / 2)`.
    pub fn chroma_height(&self) -> u32 {
        self.height.div_ceil(2)
    }

    /// Byte length of the full-resolution luma plane.
    pub fn luma_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length of one quarter-resolution chroma plane.
    pub fn chroma_len(&self) -> usize {
        self.chroma_width() as usize * self.chroma_height() as usize
    }

    /// Total byte length of one planar 4:2:0 frame:
    /// `width*height + 2*ceil(width/2)*ceil(height/2)`.
    pub fn frame_len(&self) -> usize {
        self.luma_len() + 2 * self.chroma_len()
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
