//! Integration tests: full ingest lifecycle over a real WebSocket
//! connection on localhost: geometry announcement, frame flow,
//! shedding, drop rules, and clean shutdown.

use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use luma_core::{FrameQueue, Geometry, SHED_THRESHOLD, StreamEvent, StreamIngestor};

// ── Helpers ──────────────────────────────────────────────────────

/// Spin up a WebSocket server on an OS-assigned port and connect an
/// ingestor to it. Returns the server side of the connection plus
/// the ingestor's queue, event receiver, and running task.
async fn connected_pair() -> (
    WebSocketStream<TcpStream>,
    Arc<FrameQueue>,
    mpsc::UnboundedReceiver<StreamEvent>,
    tokio::task::JoinHandle<Result<(), luma_core::LumaError>>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let accept = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio_tungstenite::accept_async(stream).await.unwrap()
    });

    let queue = Arc::new(FrameQueue::new());
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let ingestor = StreamIngestor::connect(
        &format!("ws://{addr}"),
        Arc::clone(&queue),
        event_tx,
    )
    .await
    .unwrap();

    let server = accept.await.unwrap();
    let handle = tokio::spawn(ingestor.run());

    (server, queue, event_rx, handle)
}

const INITIAL_4X2: &str = r#"{"type":"initial","data":{"width":4,"height":2}}"#;

/// 4x2 4:2:0 frame: 8 luma + 2 + 2 chroma bytes.
fn frame_4x2(marker: u8) -> Vec<u8> {
    vec![marker; 12]
}

async fn recv_event(rx: &mut mpsc::UnboundedReceiver<StreamEvent>) -> StreamEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout waiting for event")
        .expect("event channel closed")
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test]
async fn geometry_then_frames_then_close() {
    let (mut server, queue, mut events, handle) = connected_pair().await;

    server.send(Message::text(INITIAL_4X2)).await.unwrap();
    assert_eq!(
        recv_event(&mut events).await,
        StreamEvent::Configure(Geometry::new(4, 2).unwrap())
    );

    for i in 1..=3u8 {
        server.send(Message::binary(frame_4x2(i))).await.unwrap();
    }
    // First frame after idle wakes the scheduler; the rest just queue.
    assert_eq!(recv_event(&mut events).await, StreamEvent::Wake);

    server.close(None).await.unwrap();
    assert!(matches!(
        recv_event(&mut events).await,
        StreamEvent::Closed(_)
    ));
    handle.await.unwrap().unwrap();

    assert_eq!(queue.len(), 3);
    // Arrival order survives the queue.
    assert_eq!(queue.pop_one().unwrap().y()[0], 1);
    assert_eq!(queue.pop_one().unwrap().y()[0], 2);
    assert_eq!(queue.pop_one().unwrap().y()[0], 3);
}

#[tokio::test]
async fn backlog_past_threshold_is_shed_entirely() {
    let (mut server, queue, _events, handle) = connected_pair().await;

    server.send(Message::text(INITIAL_4X2)).await.unwrap();
    for i in 0..=SHED_THRESHOLD as u8 {
        server.send(Message::binary(frame_4x2(i))).await.unwrap();
    }
    server.close(None).await.unwrap();
    handle.await.unwrap().unwrap();

    // Six pushes with nobody draining: the sixth crossed the
    // threshold and cleared everything.
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.shed_count(), 1);
}

#[tokio::test]
async fn bad_payloads_are_contained_and_stream_survives() {
    let (mut server, queue, mut events, handle) = connected_pair().await;

    // Premature frame: no geometry yet.
    server.send(Message::binary(frame_4x2(0))).await.unwrap();
    // Garbage control: logged and ignored.
    server.send(Message::text("{broken")).await.unwrap();
    // Unknown tag: reserved, ignored.
    server
        .send(Message::text(r#"{"type":"stats","data":{}}"#))
        .await
        .unwrap();

    // The connection is still healthy; a proper session follows.
    server.send(Message::text(INITIAL_4X2)).await.unwrap();
    assert_eq!(
        recv_event(&mut events).await,
        StreamEvent::Configure(Geometry::new(4, 2).unwrap())
    );

    // Wrong-sized frame for 4x2 (expects 12 bytes).
    server.send(Message::binary(vec![0u8; 10])).await.unwrap();
    // Correct frame.
    server.send(Message::binary(frame_4x2(7))).await.unwrap();
    assert_eq!(recv_event(&mut events).await, StreamEvent::Wake);

    server.close(None).await.unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.pop_one().unwrap().y()[0], 7);
}

#[tokio::test]
async fn geometry_change_is_a_reinitialization() {
    let (mut server, queue, mut events, handle) = connected_pair().await;

    server.send(Message::text(INITIAL_4X2)).await.unwrap();
    assert!(matches!(
        recv_event(&mut events).await,
        StreamEvent::Configure(_)
    ));

    server.send(Message::binary(frame_4x2(1))).await.unwrap();
    assert_eq!(recv_event(&mut events).await, StreamEvent::Wake);

    // New dimensions: queued frames are stale and must go.
    server
        .send(Message::text(
            r#"{"type":"initial","data":{"width":6,"height":4}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(
        recv_event(&mut events).await,
        StreamEvent::Configure(Geometry::new(6, 4).unwrap())
    );

    // 6x4 => 24 + 2*6 = 36 bytes.
    server.send(Message::binary(vec![9u8; 36])).await.unwrap();

    server.close(None).await.unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(queue.len(), 1);
    let frame = queue.pop_one().unwrap();
    assert_eq!(frame.geometry(), Geometry::new(6, 4).unwrap());
}

#[tokio::test]
async fn abrupt_disconnect_surfaces_closed_once() {
    let (server, _queue, mut events, handle) = connected_pair().await;

    // Drop the server without a close handshake.
    drop(server);

    let event = recv_event(&mut events).await;
    assert!(matches!(event, StreamEvent::Closed(_)));

    // Terminal: the run loop has returned, no retry.
    let _ = handle.await.unwrap();
    assert!(events.recv().await.is_none());
}
