//! # luma-core
//!
//! Streaming frame pipeline: raw planar 4:2:0 video frames arrive
//! over a persistent WebSocket and are rendered to a GPU surface at
//! the display refresh cadence, tolerating irregular network timing.
//!
//! Data flow: socket → [`StreamIngestor`] → [`FrameQueue`] →
//! [`RenderScheduler`] → [`FrameSurface`] → display. Control flow:
//! the ingestor wakes the scheduler on the first frame after idle;
//! the scheduler is otherwise paced by the host's per-frame timing
//! (vsync in a windowed host, a ~60 Hz interval headless).
//!
//! The pipeline balances three constraints: the receive path never
//! blocks, backlogged frames are shed rather than rendered late, and
//! nothing is dropped while the pipeline is healthy.
//!
//! This crate contains:
//! - **Data model**: [`Geometry`], [`YuvFrame`], [`ControlMessage`]
//! - **Queue**: [`FrameQueue`] (bounded, shed-all over threshold)
//! - **Ingest**: [`StreamIngestor`] (text/binary demux over the socket)
//! - **Scheduling**: [`RenderScheduler`] + the [`FrameSink`] seam
//! - **Rendering**: [`FrameSurface`] (wgpu YUV to RGB surface)
//! - **Error**: [`LumaError`] (typed, `thiserror`-based hierarchy)

pub mod control;
pub mod convert;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod queue;
pub mod scheduler;
pub mod surface;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use control::{ControlMessage, Dimensions};
pub use error::LumaError;
pub use frame::YuvFrame;
pub use geometry::Geometry;
pub use ingest::{StreamEvent, StreamIngestor};
pub use queue::{FrameQueue, SHED_THRESHOLD};
pub use scheduler::{FrameSink, RenderScheduler, TICK_INTERVAL};
pub use surface::{FrameSurface, fitted_size};
