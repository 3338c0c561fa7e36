//! Owned planar 4:2:0 frames.
//!
//! A [`YuvFrame`] is one complete raw image: a full-resolution luma
//! plane followed by two quarter-resolution chroma planes, packed
//! contiguously with no headers or padding. The buffer is immutable
//! once constructed; ownership moves from the ingestor into the queue
//! and from the queue into the renderer for one draw call.

use bytes::Bytes;

use crate::error::LumaError;
use crate::geometry::Geometry;

/// One complete raw image in planar 4:2:0 layout.
///
/// Construction validates the payload length against the geometry, so
/// a `YuvFrame` that exists is always exactly plane-aligned and the
/// accessors below never fail.
#[derive(Debug, Clone)]
pub struct YuvFrame {
    geometry: Geometry,
    data: Bytes,
}

impl YuvFrame {
    /// Wrap a binary payload as a frame of the given geometry.
    ///
    /// Rejects payloads whose length is not exactly
    /// `geometry.frame_len()`.
    pub fn new(geometry: Geometry, data: Bytes) -> Result<Self, LumaError> {
        let expected = geometry.frame_len();
        if data.len() != expected {
            return Err(LumaError::FrameSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { geometry, data })
    }

    /// The geometry this frame was validated against.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Total payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Frames are never empty (geometry dimensions are non-zero).
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Luma plane: bytes `[0, w*h)`.
    pub fn y(&self) -> &[u8] {
        &self.data[..self.geometry.luma_len()]
    }

    /// First chroma plane: bytes `[Y, Y + cw*ch)`.
    pub fn u(&self) -> &[u8] {
        let start = self.geometry.luma_len();
        &self.data[start..start + self.geometry.chroma_len()]
    }

    /// Second chroma plane: bytes `[Y + cw*ch, Y + 2*cw*ch)`.
    pub fn v(&self) -> &[u8] {
        let start = self.geometry.luma_len() + self.geometry.chroma_len();
        &self.data[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(geometry: Geometry) -> Bytes {
        // Fill each plane with a distinct marker so slicing is
        // observable.
        let mut buf = vec![1u8; geometry.luma_len()];
        buf.extend(std::iter::repeat_n(2u8, geometry.chroma_len()));
        buf.extend(std::iter::repeat_n(3u8, geometry.chroma_len()));
        Bytes::from(buf)
    }

    #[test]
    fn accepts_exact_size() {
        let g = Geometry::new(4, 2).unwrap();
        let frame = YuvFrame::new(g, frame_bytes(g)).unwrap();
        assert_eq!(frame.len(), 12);
    }

    #[test]
    fn rejects_wrong_size() {
        let g = Geometry::new(4, 2).unwrap();
        let err = YuvFrame::new(g, Bytes::from(vec![0u8; 10])).unwrap_err();
        match err {
            LumaError::FrameSizeMismatch { expected, actual } => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn plane_slices_are_contiguous_and_ordered() {
        let g = Geometry::new(4, 2).unwrap();
        let frame = YuvFrame::new(g, frame_bytes(g)).unwrap();

        assert_eq!(frame.y().len(), 8);
        assert_eq!(frame.u().len(), 2);
        assert_eq!(frame.v().len(), 2);

        assert!(frame.y().iter().all(|&b| b == 1));
        assert!(frame.u().iter().all(|&b| b == 2));
        assert!(frame.v().iter().all(|&b| b == 3));
    }

    #[test]
    fn odd_geometry_plane_slicing() {
        let g = Geometry::new(5, 3).unwrap();
        let frame = YuvFrame::new(g, frame_bytes(g)).unwrap();
        assert_eq!(frame.y().len(), 15);
        assert_eq!(frame.u().len(), 6);
        assert_eq!(frame.v().len(), 6);
        assert_eq!(frame.len(), 27);
    }
}
