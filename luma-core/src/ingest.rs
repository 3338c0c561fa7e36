//! Stream ingestion: demultiplexes the WebSocket into control and
//! frame payloads.
//!
//! The ingestor owns the socket's receive side. Every message is
//! dispatched by payload *kind* (text vs binary), never by content
//! sniffing. Its handler is non-blocking and side-effect-scoped to
//! enqueue-and-signal only: frames go into the [`FrameQueue`], typed
//! [`StreamEvent`]s go to whoever hosts the surface.
//!
//! Connection establishment, retry, and close are the caller's
//! responsibility: [`StreamIngestor::from_stream`] accepts an
//! already-open connection, and [`connect`](StreamIngestor::connect)
//! is a convenience for the common case. A connection-level failure
//! is surfaced exactly once as [`StreamEvent::Closed`].

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::control::ControlMessage;
use crate::error::LumaError;
use crate::frame::YuvFrame;
use crate::geometry::Geometry;
use crate::queue::FrameQueue;

// ── StreamEvent ──────────────────────────────────────────────────

/// Typed events the ingestor emits toward the render host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Geometry was announced (or changed): rebuild the surface's GPU
    /// resources for these dimensions. The queue has already been
    /// reset when this arrives.
    Configure(Geometry),

    /// A push flipped the queue from idle to active: resume the
    /// per-frame drain loop.
    Wake,

    /// Terminal: the connection closed or errored. Sent once; the
    /// ingestor does not reconnect.
    Closed(Option<String>),
}

// ── IngestSession ────────────────────────────────────────────────

/// Per-session demux state, separated from the socket so the
/// dispatch rules are testable without a live connection.
struct IngestSession {
    queue: Arc<FrameQueue>,
    events: mpsc::UnboundedSender<StreamEvent>,
    geometry: Option<Geometry>,
    frames_in: u64,
    frames_dropped: u64,
}

impl IngestSession {
    fn new(queue: Arc<FrameQueue>, events: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self {
            queue,
            events,
            geometry: None,
            frames_in: 0,
            frames_dropped: 0,
        }
    }

    /// Handle a text (control) payload. Malformed JSON is logged and
    /// ignored; unrecognized tags are ignored silently.
    fn on_text(&mut self, text: &str) {
        match ControlMessage::parse(text) {
            Ok(msg @ ControlMessage::Initial { .. }) => match msg.geometry() {
                Some(geometry) => self.configure(geometry),
                None => warn!(text, "initial message with invalid dimensions ignored"),
            },
            Ok(ControlMessage::Unknown) => {
                debug!(text, "unrecognized control tag ignored");
            }
            Err(e) => {
                warn!(error = %e, "malformed control message ignored");
            }
        }
    }

    /// Apply a geometry announcement: set geometry, reset the queue,
    /// instruct the surface to rebuild. A repeat announcement with
    /// different dimensions is a full reinitialization, not a resize.
    fn configure(&mut self, geometry: Geometry) {
        if self.geometry == Some(geometry) {
            debug!(%geometry, "geometry re-announced unchanged");
            return;
        }
        info!(%geometry, "stream geometry set");
        self.geometry = Some(geometry);
        self.queue.reset();
        let _ = self.events.send(StreamEvent::Configure(geometry));
    }

    /// Handle a binary (frame) payload.
    ///
    /// Premature or size-mismatched frames are dropped with a soft
    /// warning, invisible to the viewer and never fatal.
    fn on_binary(&mut self, data: bytes::Bytes) {
        let Some(geometry) = self.geometry else {
            self.frames_dropped += 1;
            warn!(
                len = data.len(),
                dropped = self.frames_dropped,
                "frame before geometry announcement dropped"
            );
            return;
        };

        match YuvFrame::new(geometry, data) {
            Ok(frame) => {
                self.frames_in += 1;
                if self.queue.push(frame) {
                    let _ = self.events.send(StreamEvent::Wake);
                }
            }
            Err(e) => {
                self.frames_dropped += 1;
                warn!(error = %e, dropped = self.frames_dropped, "frame dropped");
            }
        }
    }
}

// ── StreamIngestor ───────────────────────────────────────────────

/// Socket-side producer of the frame pipeline.
///
/// Generic over the underlying transport so tests and embedders can
/// hand in any established duplex stream.
pub struct StreamIngestor<S> {
    ws: WebSocketStream<S>,
    session: IngestSession,
}

impl StreamIngestor<MaybeTlsStream<TcpStream>> {
    /// Open a WebSocket connection to `url` and wrap it.
    pub async fn connect(
        url: &str,
        queue: Arc<FrameQueue>,
        events: mpsc::UnboundedSender<StreamEvent>,
    ) -> Result<Self, LumaError> {
        info!(url, "connecting to stream");
        let (ws, _) = connect_async(url).await?;
        Ok(Self::from_stream(ws, queue, events))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> StreamIngestor<S> {
    /// Wrap an already-established WebSocket connection.
    pub fn from_stream(
        ws: WebSocketStream<S>,
        queue: Arc<FrameQueue>,
        events: mpsc::UnboundedSender<StreamEvent>,
    ) -> Self {
        Self {
            ws,
            session: IngestSession::new(queue, events),
        }
    }

    /// The currently announced geometry, if any.
    pub fn geometry(&self) -> Option<Geometry> {
        self.session.geometry
    }

    /// Frames accepted / dropped since construction.
    pub fn frame_counts(&self) -> (u64, u64) {
        (self.session.frames_in, self.session.frames_dropped)
    }

    /// Receive loop. Returns when the connection closes.
    ///
    /// Per-message problems (bad JSON, wrong-sized frames) are logged
    /// and contained; only the connection itself ending terminates
    /// the loop, and that is reported once via
    /// [`StreamEvent::Closed`] as well as the return value.
    pub async fn run(mut self) -> Result<(), LumaError> {
        while let Some(msg) = self.ws.next().await {
            match msg {
                Ok(Message::Text(text)) => self.session.on_text(&text),
                Ok(Message::Binary(data)) => self.session.on_binary(data),
                Ok(Message::Close(frame)) => {
                    let reason = frame.map(|f| f.reason.as_str().to_owned());
                    info!(?reason, "stream closed by peer");
                    let _ = self.session.events.send(StreamEvent::Closed(reason));
                    return Ok(());
                }
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "stream connection error");
                    let _ = self
                        .session
                        .events
                        .send(StreamEvent::Closed(Some(e.to_string())));
                    return Err(e.into());
                }
            }
        }

        info!("stream ended");
        let _ = self.session.events.send(StreamEvent::Closed(None));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn session() -> (
        IngestSession,
        Arc<FrameQueue>,
        mpsc::UnboundedReceiver<StreamEvent>,
    ) {
        let queue = Arc::new(FrameQueue::new());
        let (tx, rx) = mpsc::unbounded_channel();
        (IngestSession::new(Arc::clone(&queue), tx), queue, rx)
    }

    const INITIAL_4X2: &str = r#"{"type":"initial","data":{"width":4,"height":2}}"#;

    #[test]
    fn frame_before_geometry_is_dropped() {
        let (mut s, queue, mut rx) = session();

        s.on_binary(Bytes::from(vec![0u8; 12]));

        assert_eq!(queue.len(), 0);
        assert_eq!(s.frames_dropped, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn initial_configures_then_frames_flow() {
        let (mut s, queue, mut rx) = session();

        s.on_text(INITIAL_4X2);
        assert_eq!(
            rx.try_recv().unwrap(),
            StreamEvent::Configure(Geometry::new(4, 2).unwrap())
        );

        s.on_binary(Bytes::from(vec![0u8; 12]));
        assert_eq!(queue.len(), 1);
        // First push since idle also wakes the scheduler.
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Wake);

        // Second frame while active: queued, no extra wake.
        s.on_binary(Bytes::from(vec![0u8; 12]));
        assert_eq!(queue.len(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn size_mismatch_is_dropped_not_queued() {
        let (mut s, queue, _rx) = session();
        s.on_text(INITIAL_4X2);

        s.on_binary(Bytes::from(vec![0u8; 10]));
        assert_eq!(queue.len(), 0);
        assert_eq!(s.frames_in, 0);
        assert_eq!(s.frames_dropped, 1);
    }

    #[test]
    fn malformed_and_unknown_control_are_ignored() {
        let (mut s, queue, mut rx) = session();

        s.on_text("definitely not json");
        s.on_text(r#"{"type":"stats","data":{"fps":60}}"#);

        assert!(s.geometry.is_none());
        assert_eq!(queue.len(), 0);
        assert!(rx.try_recv().is_err(), "no events for ignored control");
    }

    #[test]
    fn geometry_change_resets_queued_frames() {
        let (mut s, queue, mut rx) = session();
        s.on_text(INITIAL_4X2);
        rx.try_recv().unwrap();

        s.on_binary(Bytes::from(vec![0u8; 12]));
        s.on_binary(Bytes::from(vec![0u8; 12]));
        assert_eq!(queue.len(), 2);
        rx.try_recv().unwrap(); // wake

        // New dimensions: stale frames cleared, surface reconfigured.
        s.on_text(r#"{"type":"initial","data":{"width":6,"height":4}}"#);
        assert_eq!(queue.len(), 0);
        assert_eq!(
            rx.try_recv().unwrap(),
            StreamEvent::Configure(Geometry::new(6, 4).unwrap())
        );

        // Old-size frames no longer fit the new geometry.
        s.on_binary(Bytes::from(vec![0u8; 12]));
        assert_eq!(queue.len(), 0);

        // 6x4 => 24 + 2*(3*2) = 36 bytes.
        s.on_binary(Bytes::from(vec![0u8; 36]));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn unchanged_geometry_reannouncement_keeps_queue() {
        let (mut s, queue, mut rx) = session();
        s.on_text(INITIAL_4X2);
        rx.try_recv().unwrap();

        s.on_binary(Bytes::from(vec![0u8; 12]));
        assert_eq!(queue.len(), 1);

        s.on_text(INITIAL_4X2);
        assert_eq!(queue.len(), 1);
    }
}
