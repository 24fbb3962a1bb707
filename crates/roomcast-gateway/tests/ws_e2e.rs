#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use roomcast_core::protocol::text::{Frame, FrameKind};
use roomcast_gateway::app_state::AppState;
use roomcast_gateway::config;
use roomcast_gateway::server::Server;

const CFG: &str = r#"
version: 1
gateway:
  listen: "127.0.0.1:0"
  ws_path: "/chat"
  max_frame_bytes: 256
"#;

struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    async fn connect(server: &Server) -> Self {
        let url = format!("ws://{}/chat", server.ws_addr());
        let (ws, _resp) = connect_async(url).await.unwrap();
        Self { ws }
    }

    async fn send(&mut self, text: &str) {
        self.ws.send(Message::text(text.to_owned())).await.unwrap();
    }

    /// Next text frame, skipping control frames.
    async fn recv(&mut self) -> Frame {
        loop {
            let msg = timeout(Duration::from_secs(5), self.ws.next())
                .await
                .expect("frame within 5s")
                .expect("connection open")
                .unwrap();
            match msg {
                Message::Text(t) => return Frame::decode(t.as_bytes()).unwrap(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected ws message: {other:?}"),
            }
        }
    }

    /// Waits for the server to end the connection.
    async fn closed(&mut self) {
        loop {
            let next = timeout(Duration::from_secs(5), self.ws.next())
                .await
                .expect("closed within 5s");
            match next {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => continue,
            }
        }
    }
}

async fn wait_for_count(server: &Server, n: usize) {
    for _ in 0..100 {
        if server.state().group().count() == n {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("group count never reached {n}");
}

#[tokio::test]
async fn join_message_and_disconnect_over_ws() {
    let state = AppState::new(config::load_from_str(CFG).unwrap()).unwrap();
    let server = Server::start(state).await.unwrap();
    assert!(server.tcp_addr().is_none());

    let mut a = Client::connect(&server).await;
    a.send(r#"{"v":1,"svc":"room","type":"join","seq":1}"#).await;
    let members = a.recv().await;
    assert_eq!(members.kind, FrameKind::Push);
    assert_eq!(members.route.as_deref(), Some("onMembers"));
    let resp = a.recv().await;
    assert_eq!(resp.kind, FrameKind::Response);
    assert_eq!(resp.seq, Some(1));
    assert_eq!(resp.data["result"], "success");

    let mut b = Client::connect(&server).await;
    b.send(r#"{"v":1,"svc":"room","type":"join","seq":7}"#).await;
    assert_eq!(b.recv().await.data["members"].as_array().unwrap().len(), 1);
    assert_eq!(b.recv().await.seq, Some(7));
    let news = a.recv().await;
    assert_eq!(news.route.as_deref(), Some("onNewUser"));

    b.send(r#"{"v":1,"svc":"room","type":"message","data":{"name":"b","content":"over ws"}}"#)
        .await;
    for client in [&mut a, &mut b] {
        let msg = client.recv().await;
        assert_eq!(msg.route.as_deref(), Some("onMessage"));
        assert_eq!(msg.data["name"], "b");
        assert_eq!(msg.data["content"], "over ws");
    }

    // Binary frames carry envelopes too.
    a.ws
        .send(Message::binary(
            br#"{"v":1,"svc":"room","type":"nope","seq":2}"#.to_vec(),
        ))
        .await
        .unwrap();
    let err = a.recv().await;
    assert_eq!(err.kind, FrameKind::Error);
    assert_eq!(err.seq, Some(2));
    assert_eq!(err.data["code"], "UNKNOWN_ROUTE");

    a.send(&"x".repeat(300)).await;
    let err = a.recv().await;
    assert_eq!(err.data["code"], "PAYLOAD_TOO_LARGE");

    b.ws.close(None).await.unwrap();
    wait_for_count(&server, 1).await;
    assert_eq!(server.state().sessions().len(), 1);

    let state = server.state().clone();
    server.shutdown().await;
    a.closed().await;
    assert!(state.sessions().is_empty());
    assert!(state.group().is_closed());
}
