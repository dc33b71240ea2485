use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{parse_command, ProtocolError, ServerMessage, WELCOME_MESSAGE};
use super::registry::{ClientId, ClientRegistry};
use crate::progress::ProgressBus;
use crate::state::AppState;

/// Connection-side settings plus the shared client registry.
#[derive(Clone)]
pub struct BroadcastHub {
    pub registry: Arc<ClientRegistry>,
    /// Per-connection outbound queue length.
    pub queue_capacity: usize,
    /// Grace period for a single socket write before the connection is dropped.
    pub send_timeout: Duration,
}

impl BroadcastHub {
    pub fn new(queue_capacity: usize, send_timeout: Duration) -> Self {
        Self {
            registry: Arc::new(ClientRegistry::new()),
            queue_capacity: queue_capacity.max(1),
            send_timeout,
        }
    }
}

/// Subscribes the registry to the bus and fans every event out.
/// Resubscribes if the bus ever drops the relay.
pub fn spawn_relay(bus: ProgressBus, registry: Arc<ClientRegistry>) -> JoinHandle<()> {
    let mut subscription = bus.subscribe();
    tokio::spawn(async move {
        loop {
            while let Some(event) = subscription.recv().await {
                let report = registry.dispatch(&event);
                if report.dropped > 0 {
                    debug!(
                        dropped = report.dropped,
                        delivered = report.delivered,
                        filtered = report.filtered,
                        "Dropped unresponsive progress observers"
                    );
                }
            }
            warn!(
                subscription = subscription.id,
                "Broadcast relay lost its progress bus subscription, resubscribing"
            );
            subscription = bus.subscribe();
        }
    })
}

/// GET /ws/progress
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: BroadcastHub) {
    let (sink, stream) = socket.split();
    let (outbound, outbound_rx) = mpsc::channel::<String>(hub.queue_capacity);

    let id = hub.registry.register(outbound);
    info!(client = id, observers = hub.registry.len(), "Progress observer connected");
    hub.registry.send_to(
        id,
        &ServerMessage::Welcome {
            message: WELCOME_MESSAGE.to_string(),
        },
    );

    let mut writer = tokio::spawn(write_frames(sink, outbound_rx, hub.send_timeout, id));

    tokio::select! {
        _ = &mut writer => {}
        _ = read_commands(stream, &hub.registry, id) => {}
    }

    hub.registry.remove(id);
    writer.abort();
    info!(client = id, "Progress observer disconnected");
}

/// Single writer per connection. Ends when the queue closes (client removed
/// from the registry) or a write fails or overruns the grace period.
async fn write_frames<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<String>,
    send_timeout: Duration,
    id: ClientId,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(text) = outbound.recv().await {
        match tokio::time::timeout(send_timeout, sink.send(Message::Text(text))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(client = id, "Progress observer write failed: {e}");
                return;
            }
            Err(_) => {
                warn!(
                    client = id,
                    timeout_ms = send_timeout.as_millis() as u64,
                    "Progress observer write timed out, closing connection"
                );
                return;
            }
        }
    }
    let _ = tokio::time::timeout(send_timeout, sink.close()).await;
}

async fn read_commands<S>(mut stream: S, registry: &ClientRegistry, id: ClientId)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    registry.send_to(id, &ProtocolError::InvalidJson.to_message());
                    continue;
                }
            },
            Ok(Message::Close(_)) => return,
            Ok(_) => continue, // ping/pong frames are answered by the transport
            Err(e) => {
                debug!(client = id, "Progress observer socket error: {e}");
                return;
            }
        };

        let reply = match parse_command(&text) {
            Ok(command) => registry.apply(id, command),
            Err(e) => {
                debug!(client = id, "Rejected observer message: {e}");
                e.to_message()
            }
        };

        if !registry.send_to(id, &reply) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use serde_json::Value;
    use tokio_tungstenite::tungstenite::Message as ClientMessage;

    use super::*;
    use crate::pipeline::PipelineMode;
    use crate::progress::ProgressStage;
    use crate::routes::build_router;
    use crate::routes::testing::state_with_bus;

    /// A socket whose send buffer never drains.
    struct StalledSink;

    impl Sink<Message> for StalledSink {
        type Error = Infallible;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Infallible> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Pending
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Pending
        }
    }

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn serve(state: AppState) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        addr
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/progress"))
            .await
            .unwrap();
        client
    }

    async fn next_message(client: &mut Client) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
                .await
                .expect("no frame in time")
                .expect("socket closed")
                .unwrap();
            if let ClientMessage::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn next_json(rx: &mut mpsc::Receiver<String>) -> serde_json::Value {
        let text = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("relay did not deliver in time")
            .expect("queue closed");
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_relay_forwards_bus_events_to_observers() {
        let bus = ProgressBus::new(16);
        let hub = BroadcastHub::new(8, Duration::from_secs(1));
        let relay = spawn_relay(bus.clone(), hub.registry.clone());
        assert_eq!(bus.subscriber_count(), 1);

        let (tx, mut rx) = mpsc::channel(8);
        let id = hub.registry.register(tx);
        hub.registry.apply(
            id,
            crate::broadcast::protocol::ClientCommand::Subscribe {
                request_id: "r1".to_string(),
            },
        );

        bus.emit(Some("other"), ProgressStage::ScrapingSite, "ignored", None);
        bus.emit(Some("r1"), ProgressStage::Completed, "done", None);

        let value = next_json(&mut rx).await;
        assert_eq!(value["type"], "progress");
        assert_eq!(value["requestId"], "r1");
        assert_eq!(value["stage"], "completed");
        assert!(value["timestamp"].is_string());

        relay.abort();
    }

    #[tokio::test]
    async fn test_stalled_writer_returns_after_send_timeout() {
        let (tx, rx) = mpsc::channel(4);
        tx.send("frame".to_string()).await.unwrap();

        let finished = tokio::time::timeout(
            Duration::from_secs(1),
            write_frames(StalledSink, rx, Duration::from_millis(50), 1),
        )
        .await;
        assert!(finished.is_ok(), "writer kept waiting on a stalled socket");
    }

    #[tokio::test]
    async fn test_writer_sends_queued_frames_in_order_then_closes() {
        let (sink, mut written) = futures::channel::mpsc::unbounded::<Message>();
        let (tx, rx) = mpsc::channel(4);
        tx.send("one".to_string()).await.unwrap();
        tx.send("two".to_string()).await.unwrap();
        drop(tx);

        write_frames(sink, rx, Duration::from_secs(1), 1).await;

        let mut frames = Vec::new();
        while let Some(Message::Text(text)) = written.next().await {
            frames.push(text);
        }
        assert_eq!(frames, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_socket_welcomes_and_survives_malformed_frames() {
        let (state, _bus) = state_with_bus(PipelineMode::Testing);
        let observers = state.hub.registry.clone();
        let addr = serve(state).await;
        let mut client = connect(addr).await;

        let welcome = next_message(&mut client).await;
        assert_eq!(welcome["type"], "welcome");
        assert_eq!(welcome["message"], WELCOME_MESSAGE);
        assert_eq!(observers.len(), 1);

        client.send(ClientMessage::Text("not json".to_string())).await.unwrap();
        let reply = next_message(&mut client).await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["message"], "Invalid JSON payload");

        client
            .send(ClientMessage::Text(r#"{"type":"dance"}"#.to_string()))
            .await
            .unwrap();
        assert_eq!(next_message(&mut client).await["message"], "Unrecognized message type");

        client
            .send(ClientMessage::Text(r#"{"type":"ping"}"#.to_string()))
            .await
            .unwrap();
        let pong = next_message(&mut client).await;
        assert_eq!(pong["type"], "pong");
        assert!(pong["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_socket_receives_progress_for_its_request_only() {
        let (state, bus) = state_with_bus(PipelineMode::Testing);
        let relay = spawn_relay(bus.clone(), state.hub.registry.clone());
        let addr = serve(state).await;
        let mut client = connect(addr).await;
        assert_eq!(next_message(&mut client).await["type"], "welcome");

        client
            .send(ClientMessage::Text(
                r#"{"type":"subscribe","requestId":"ws-1"}"#.to_string(),
            ))
            .await
            .unwrap();
        let subscribed = next_message(&mut client).await;
        assert_eq!(subscribed["type"], "subscribed");
        assert_eq!(subscribed["requestId"], "ws-1");

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/api/v1/analyze"))
            .json(&serde_json::json!({ "resumeText": "Rust engineer", "requestId": "ws-1" }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        bus.emit(Some("ws-2"), ProgressStage::Completed, "someone else", None);

        let first = next_message(&mut client).await;
        assert_eq!(first["type"], "progress");
        assert_eq!(first["requestId"], "ws-1");
        assert_eq!(first["stage"], "testing");
        let second = next_message(&mut client).await;
        assert_eq!(second["stage"], "completed");
        assert_eq!(second["requestId"], "ws-1");

        relay.abort();
    }

    #[tokio::test]
    async fn test_closed_socket_is_removed_from_registry() {
        let (state, _bus) = state_with_bus(PipelineMode::Testing);
        let observers = state.hub.registry.clone();
        let addr = serve(state).await;
        let mut client = connect(addr).await;
        assert_eq!(next_message(&mut client).await["type"], "welcome");

        client.close(None).await.unwrap();
        for _ in 0..50 {
            if observers.len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(observers.len(), 0);
    }

    #[test]
    fn test_hub_capacity_never_zero() {
        let hub = BroadcastHub::new(0, Duration::from_millis(10));
        assert_eq!(hub.queue_capacity, 1);
    }
}
