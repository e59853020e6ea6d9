//! End-to-end tests against an in-process WebSocket server.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use rstest::rstest;
use serde_json::{Value, json};
use surreal_rpc::{CloseCode, ConnectionPhase, Params, Ping, RpcError, RpcSocket, Version};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as FrameCloseCode;
use tokio_tungstenite::{WebSocketStream, accept_async};
use url::Url;

use crate::{WsConnection, WsError};

type ServerStream = WebSocketStream<TcpStream>;

/// Accepts one WebSocket client and hands it to `handler`.
async fn serve<F, Fut>(handler: F) -> Url
where
    F: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local address");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let stream = accept_async(stream).await.expect("server handshake");
        handler(stream).await;
    });
    Url::parse(&format!("ws://{address}/rpc")).expect("server URL")
}

async fn next_request(stream: &mut ServerStream) -> Value {
    loop {
        match stream.next().await.expect("client hung up").expect("read failed") {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("request is not JSON");
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame from client: {other:?}"),
        }
    }
}

async fn reply(stream: &mut ServerStream, body: &Value) {
    stream
        .send(Message::Text(body.to_string().into()))
        .await
        .expect("reply");
}

/// Reads until the client goes away.
async fn drain(stream: &mut ServerStream) {
    while let Some(Ok(_)) = stream.next().await {}
}

async fn connected(url: &Url) -> RpcSocket<WsConnection> {
    let socket = RpcSocket::new(WsConnection::from_current().expect("runtime"));
    socket.connect(url).await.expect("connect");
    socket
}

#[test]
fn construction_requires_a_runtime() {
    assert!(matches!(
        WsConnection::from_current(),
        Err(WsError::NoRuntime(_))
    ));
}

#[tokio::test]
async fn calls_round_trip_over_websocket() {
    let url = serve(|mut stream| async move {
        let version = next_request(&mut stream).await;
        assert_eq!(version["method"], "version");
        reply(&mut stream, &json!({ "id": version["id"], "result": "surrealdb-2.0.0" })).await;

        let ping = next_request(&mut stream).await;
        assert_eq!(ping["method"], "ping");
        let body = json!({ "id": ping["id"], "result": null }).to_string();
        stream
            .send(Message::Binary(body.into_bytes().into()))
            .await
            .expect("binary reply");
        drain(&mut stream).await;
    })
    .await;

    let socket = connected(&url).await;

    assert_eq!(socket.request(&Version).await.expect("version"), "surrealdb-2.0.0");
    socket.request_void(&Ping).await.expect("ping");
}

#[tokio::test]
async fn responses_are_matched_by_id_over_websocket() {
    let url = serve(|mut stream| async move {
        let first = next_request(&mut stream).await;
        let second = next_request(&mut stream).await;
        for request in [second, first] {
            let answer = json!({ "id": request["id"], "result": request["params"][0] });
            reply(&mut stream, &answer).await;
        }
        drain(&mut stream).await;
    })
    .await;

    let socket = connected(&url).await;
    let (first, second) = tokio::join!(
        socket.call::<String>("echo", Params::from(vec![json!("first")])),
        socket.call::<String>("echo", Params::from(vec![json!("second")])),
    );

    assert_eq!(first.expect("first"), "first");
    assert_eq!(second.expect("second"), "second");
}

#[rstest]
#[case::explicit_code(Some(4001), 4001)]
#[case::no_status(None, 1005)]
#[tokio::test]
async fn server_close_fails_pending_calls(#[case] sent: Option<u16>, #[case] expected: u16) {
    let url = serve(move |mut stream| async move {
        next_request(&mut stream).await;
        let frame = sent.map(|code| CloseFrame {
            code: FrameCloseCode::from(code),
            reason: String::from("closing").into(),
        });
        stream.close(frame).await.expect("close");
        drain(&mut stream).await;
    })
    .await;

    let socket = connected(&url).await;
    let outcome = socket.request(&Version).await;

    assert!(
        matches!(outcome, Err(RpcError::Disconnected { code }) if code == CloseCode(expected)),
        "unexpected outcome: {outcome:?}"
    );
    assert!(!socket.is_connected());
}

#[tokio::test]
async fn disconnect_sends_a_normal_close() {
    let (observed, close_frame) = oneshot::channel();
    let url = serve(|mut stream| async move {
        let frame = loop {
            match stream.next().await {
                Some(Ok(Message::Close(frame))) => break frame,
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break None,
            }
        };
        observed
            .send(frame.map(|frame| u16::from(frame.code)))
            .expect("test still waiting");
    })
    .await;

    let socket = connected(&url).await;
    socket.disconnect_now();

    assert!(!socket.is_connected());
    assert_eq!(close_frame.await.expect("server finished"), Some(1000));
}

#[tokio::test]
async fn server_pings_are_answered() {
    let (observed, pong) = oneshot::channel();
    let url = serve(|mut stream| async move {
        stream
            .send(Message::Ping(b"probe".to_vec().into()))
            .await
            .expect("ping");
        let answer = loop {
            match stream.next().await {
                Some(Ok(Message::Pong(data))) => break Some(data.to_vec()),
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break None,
            }
        };
        observed.send(answer).expect("test still waiting");
        drain(&mut stream).await;
    })
    .await;

    let socket = connected(&url).await;

    assert_eq!(pong.await.expect("server finished"), Some(b"probe".to_vec()));
    assert!(socket.is_connected());
}

#[tokio::test]
async fn unreachable_server_fails_the_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local address");
    drop(listener);
    let url = Url::parse(&format!("ws://{address}/rpc")).expect("URL");

    let socket = RpcSocket::new(WsConnection::from_current().expect("runtime"));
    let outcome = socket.connect(&url).await;

    assert!(
        matches!(outcome, Err(RpcError::Transport { .. })),
        "unexpected outcome: {outcome:?}"
    );
    assert_eq!(
        socket.phase(),
        ConnectionPhase::Disconnected(CloseCode::ABNORMAL),
        "a refused handshake must leave the socket reusable"
    );
}
