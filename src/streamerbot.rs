//! Streamer.bot WebSocket client.
//!
//! The client speaks just enough of the Streamer.bot request protocol to list
//! and run actions: the optional `Hello`/`Authenticate` handshake, then
//! `GetActions` and `DoAction` requests correlated by their `id` field.
//!
//! The socket lives on its own tokio task. Requests reach it over an mpsc
//! channel and each carries a oneshot sender for its response. When the socket
//! closes every pending request fails with [`ClientError::Disconnected`] and
//! [`StreamerbotClient::is_connected`] turns false until the task has
//! reconnected, which it retries every [`ClientOptions::reconnect_delay`].
//! A rejected password ends the retries.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::action::ActionClient;

/// Host used when none is configured.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 8080;
/// WebSocket path used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "/";
/// Pause between reconnection attempts when none is configured.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

// Servers with authentication enabled greet immediately; others may stay quiet.
const HELLO_TIMEOUT: Duration = Duration::from_millis(1500);
const AUTH_REQUEST_ID: &str = "scene-countdown-auth";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors raised by [`StreamerbotClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The WebSocket connection could not be opened.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        /// Address that was dialled.
        url: String,
        /// Underlying transport error.
        #[source]
        source: tungstenite::Error,
    },
    /// The server rejected or could not complete authentication.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The connection is closed.
    #[error("connection closed")]
    Disconnected,
    /// The server answered a request with an error status.
    #[error("{request} request failed: {message}")]
    Request {
        /// Request name, e.g. `DoAction`.
        request: String,
        /// Error text reported by the server.
        message: String,
    },
    /// Transport error on an established connection.
    #[error("websocket error: {0}")]
    Socket(#[from] tungstenite::Error),
    /// The server sent something that is not JSON.
    #[error("invalid json from server: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// WebSocket path, normally `/`.
    pub endpoint: String,
    /// Password for servers with authentication enabled; may be empty.
    pub password: String,
    /// Pause between reconnection attempts; `None` never reconnects.
    pub reconnect_delay: Option<Duration>,
}

impl ClientOptions {
    /// The `ws://` URL these options point at.
    pub fn url(&self) -> String {
        let endpoint = self.endpoint.trim();
        if endpoint.starts_with('/') {
            format!("ws://{}:{}{}", self.host, self.port, endpoint)
        } else {
            format!("ws://{}:{}/{}", self.host, self.port, endpoint)
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            password: String::new(),
            reconnect_delay: Some(DEFAULT_RECONNECT_DELAY),
        }
    }
}

/// Computes the `Authenticate` token for a server challenge:
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`.
pub fn authentication_token(password: &str, salt: &str, challenge: &str) -> String {
    let secret = STANDARD.encode(Sha256::digest(format!("{password}{salt}")));
    STANDARD.encode(Sha256::digest(format!("{secret}{challenge}")))
}

/// Fails with the server's error text unless `response` reports success.
/// Responses without a `status` field count as successful.
fn check_status(request: &str, response: Value) -> Result<Value, ClientError> {
    match response.get("status").and_then(Value::as_str) {
        None | Some("ok") => Ok(response),
        Some(_) => {
            let message = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(ClientError::Request {
                request: request.to_string(),
                message,
            })
        }
    }
}

/// Reads the next JSON text frame, skipping control and binary frames.
/// Returns `Ok(None)` once the server closes the connection.
async fn next_json(socket: &mut Socket) -> Result<Option<Value>, ClientError> {
    while let Some(message) = socket.next().await {
        match message? {
            Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
            Message::Close(_) => return Ok(None),
            _ => continue,
        }
    }
    Ok(None)
}

async fn authenticate(socket: &mut Socket, password: &str, auth: &Value) -> Result<(), ClientError> {
    let field = |name: &str| {
        auth.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Authentication(format!("hello is missing {name}")))
    };
    let salt = field("salt")?;
    let challenge = field("challenge")?;
    if password.is_empty() {
        return Err(ClientError::Authentication(
            "server requires a password but none is configured".to_string(),
        ));
    }

    let request = json!({
        "request": "Authenticate",
        "id": AUTH_REQUEST_ID,
        "authentication": authentication_token(password, salt, challenge),
    });
    socket.send(Message::Text(request.to_string())).await?;

    loop {
        let Some(response) = next_json(socket).await? else {
            return Err(ClientError::Disconnected);
        };
        if response.get("id").and_then(Value::as_str) != Some(AUTH_REQUEST_ID) {
            continue;
        }
        return match check_status("Authenticate", response) {
            Ok(_) => Ok(()),
            Err(ClientError::Request { message, .. }) => Err(ClientError::Authentication(message)),
            Err(err) => Err(err),
        };
    }
}

struct PendingRequest {
    id: String,
    request: &'static str,
    payload: Value,
    reply: oneshot::Sender<Result<Value, ClientError>>,
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("request", &self.request)
            .finish()
    }
}

struct InFlight {
    request: &'static str,
    reply: oneshot::Sender<Result<Value, ClientError>>,
}

/// Serves requests over `socket` until it closes. Returns `true` when the
/// client handle was dropped, `false` when the server went away.
async fn run_connection(
    socket: Socket,
    requests: &mut mpsc::UnboundedReceiver<PendingRequest>,
) -> bool {
    let (mut sink, mut stream) = socket.split();
    let mut in_flight: HashMap<String, InFlight> = HashMap::new();

    let owner_gone = loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else {
                    let _ = sink.close().await;
                    break true;
                };
                if let Err(err) = sink.send(Message::Text(request.payload.to_string())).await {
                    let _ = request.reply.send(Err(ClientError::Socket(err)));
                    break false;
                }
                in_flight.insert(
                    request.id,
                    InFlight {
                        request: request.request,
                        reply: request.reply,
                    },
                );
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => dispatch(&text, &mut in_flight),
                Some(Ok(Message::Close(_))) | None => break false,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(?err, "Streamer.bot socket read error");
                    break false;
                }
            },
        }
    };

    for (_, pending) in in_flight.drain() {
        let _ = pending.reply.send(Err(ClientError::Disconnected));
    }
    owner_gone
}

/// Answers every request with [`ClientError::Disconnected`] for `delay`.
/// Returns `false` if the client handle was dropped meanwhile.
async fn wait_disconnected(
    requests: &mut mpsc::UnboundedReceiver<PendingRequest>,
    delay: Duration,
) -> bool {
    let pause = tokio::time::sleep(delay);
    tokio::pin!(pause);
    loop {
        tokio::select! {
            _ = &mut pause => return true,
            request = requests.recv() => match request {
                Some(request) => {
                    let _ = request.reply.send(Err(ClientError::Disconnected));
                }
                None => return false,
            },
        }
    }
}

/// Owns the connection for the lifetime of a [`StreamerbotClient`], opening
/// it again after every disconnect.
async fn supervise(
    mut socket: Option<Socket>,
    options: ClientOptions,
    mut requests: mpsc::UnboundedReceiver<PendingRequest>,
    connected: Arc<AtomicBool>,
) {
    let url = options.url();
    loop {
        let current = match socket.take() {
            Some(current) => current,
            None => match open(&options).await {
                Ok(current) => current,
                Err(ClientError::Authentication(reason)) => {
                    warn!(%url, %reason, "Streamer.bot rejected authentication, not reconnecting");
                    return;
                }
                Err(err) => {
                    debug!(%url, error = %err, "Streamer.bot not reachable");
                    match options.reconnect_delay {
                        Some(delay) if wait_disconnected(&mut requests, delay).await => continue,
                        _ => return,
                    }
                }
            },
        };

        connected.store(true, Ordering::SeqCst);
        let owner_gone = run_connection(current, &mut requests).await;
        connected.store(false, Ordering::SeqCst);
        if owner_gone {
            return;
        }

        warn!(%url, "Streamer.bot client: disconnected");
        match options.reconnect_delay {
            Some(delay) if wait_disconnected(&mut requests, delay).await => {}
            _ => return,
        }
    }
}

/// Opens the socket and completes the handshake.
async fn open(options: &ClientOptions) -> Result<Socket, ClientError> {
    let url = options.url();
    let (mut socket, _response) =
        connect_async(url.as_str())
            .await
            .map_err(|source| ClientError::Connect {
                url: url.clone(),
                source,
            })?;

    match tokio::time::timeout(HELLO_TIMEOUT, next_json(&mut socket)).await {
        Ok(Ok(Some(hello))) => {
            if let Some(auth) = hello.get("authentication") {
                authenticate(&mut socket, &options.password, auth).await?;
            }
        }
        Ok(Ok(None)) => return Err(ClientError::Disconnected),
        Ok(Err(err)) => return Err(err),
        Err(_) => debug!(%url, "no hello from Streamer.bot, continuing unauthenticated"),
    }

    info!(%url, "Streamer.bot client: connected");
    Ok(socket)
}

fn dispatch(text: &str, in_flight: &mut HashMap<String, InFlight>) {
    let response: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(?err, "ignoring malformed Streamer.bot message");
            return;
        }
    };
    let pending = response
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| in_flight.remove(id));
    match pending {
        Some(pending) => {
            let _ = pending.reply.send(check_status(pending.request, response));
        }
        None => debug!(%response, "unsolicited Streamer.bot message"),
    }
}

/// Connected Streamer.bot client.
#[derive(Debug)]
pub struct StreamerbotClient {
    requests: mpsc::UnboundedSender<PendingRequest>,
    connected: Arc<AtomicBool>,
    next_request: AtomicU64,
}

impl StreamerbotClient {
    /// Opens the connection and completes the handshake.
    ///
    /// # Errors
    ///
    /// Fails when the socket cannot be opened, the server closes it during the
    /// handshake, or authentication is rejected.
    pub async fn connect(options: &ClientOptions) -> Result<Self, ClientError> {
        let socket = open(options).await?;
        Ok(Self::spawn(Some(socket), options.clone()))
    }

    /// Returns at once and keeps trying to connect in the background.
    ///
    /// The client reports itself disconnected until the first handshake
    /// succeeds. Must be called from within a tokio runtime.
    pub fn connect_in_background(options: &ClientOptions) -> Self {
        Self::spawn(None, options.clone())
    }

    fn spawn(socket: Option<Socket>, options: ClientOptions) -> Self {
        let connected = Arc::new(AtomicBool::new(socket.is_some()));
        let (requests, receiver) = mpsc::unbounded_channel();
        tokio::spawn(supervise(socket, options, receiver, connected.clone()));

        Self {
            requests,
            connected,
            next_request: AtomicU64::new(0),
        }
    }

    /// Whether the socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Sends `request` with the fields of `payload` and waits for the answer.
    ///
    /// # Errors
    ///
    /// [`ClientError::Disconnected`] when the connection is gone, or
    /// [`ClientError::Request`] when the server reports an error status.
    pub async fn request(&self, request: &'static str, payload: Value) -> Result<Value, ClientError> {
        let id = format!(
            "scene-countdown-{}",
            self.next_request.fetch_add(1, Ordering::Relaxed) + 1
        );
        let mut payload = payload;
        payload["request"] = json!(request);
        payload["id"] = json!(id);

        let (reply, response) = oneshot::channel();
        self.requests
            .send(PendingRequest {
                id,
                request,
                payload,
                reply,
            })
            .map_err(|_| ClientError::Disconnected)?;
        response.await.map_err(|_| ClientError::Disconnected)?
    }

    /// Lists every action configured on the server.
    pub async fn get_actions(&self) -> Result<Value, ClientError> {
        self.request("GetActions", json!({})).await
    }

    /// Runs the action with the given identifier.
    pub async fn do_action(&self, id: &str) -> Result<Value, ClientError> {
        self.request("DoAction", json!({ "action": { "id": id }, "args": {} }))
            .await
    }
}

#[async_trait]
impl ActionClient for StreamerbotClient {
    async fn do_action(&self, id: &str) -> anyhow::Result<Value> {
        Ok(StreamerbotClient::do_action(self, id).await?)
    }

    async fn get_actions(&self) -> anyhow::Result<Value> {
        Ok(StreamerbotClient::get_actions(self).await?)
    }

    fn is_connected(&self) -> bool {
        StreamerbotClient::is_connected(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionInvoker, ActionTarget};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    type ServerSocket = WebSocketStream<TcpStream>;

    async fn listen() -> (TcpListener, ClientOptions) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let options = ClientOptions {
            host: "127.0.0.1".into(),
            port,
            ..ClientOptions::default()
        };
        (listener, options)
    }

    async fn accept(listener: &TcpListener) -> ServerSocket {
        let (stream, _) = listener.accept().await.unwrap();
        accept_async(stream).await.unwrap()
    }

    async fn recv_json(ws: &mut ServerSocket) -> Value {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    async fn send_json(ws: &mut ServerSocket, value: Value) {
        ws.send(Message::Text(value.to_string())).await.unwrap();
    }

    fn hello(auth: Option<Value>) -> Value {
        let mut hello = json!({ "request": "Hello", "info": { "name": "test" } });
        if let Some(auth) = auth {
            hello["authentication"] = auth;
        }
        hello
    }

    #[test]
    fn test_url_from_options() {
        assert_eq!(ClientOptions::default().url(), "ws://127.0.0.1:8080/");
        let options = ClientOptions {
            endpoint: "ws".into(),
            ..ClientOptions::default()
        };
        assert_eq!(options.url(), "ws://127.0.0.1:8080/ws");
    }

    #[test]
    fn test_authentication_token_shape() {
        let token = authentication_token("secret", "salt", "challenge");
        assert_eq!(token, authentication_token("secret", "salt", "challenge"));
        assert_ne!(token, authentication_token("other", "salt", "challenge"));
        assert_ne!(token, authentication_token("secret", "salt", "other"));
        // A base64-encoded SHA-256 digest is always 44 characters.
        assert_eq!(token.len(), 44);
    }

    #[test]
    fn test_check_status() {
        assert!(check_status("DoAction", json!({ "status": "ok" })).is_ok());
        assert!(check_status("DoAction", json!({ "id": "1" })).is_ok());
        let err = check_status("DoAction", json!({ "status": "error", "error": "nope" }));
        assert!(matches!(
            err,
            Err(ClientError::Request { ref message, .. }) if message == "nope"
        ));
    }

    #[tokio::test]
    async fn test_lists_and_runs_actions_by_name() {
        let (listener, options) = listen().await;
        let (seen_tx, seen_rx) = oneshot::channel::<Value>();

        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            send_json(&mut ws, hello(None)).await;

            let list = recv_json(&mut ws).await;
            assert_eq!(list["request"], "GetActions");
            send_json(
                &mut ws,
                json!({
                    "id": list["id"],
                    "status": "ok",
                    "actions": [
                        { "name": "Scene1", "id": "zzz" },
                        { "name": "Scene2", "id": "abc" },
                    ],
                    "count": 2,
                }),
            )
            .await;

            let run = recv_json(&mut ws).await;
            send_json(&mut ws, json!({ "id": run["id"], "status": "ok" })).await;
            let _ = seen_tx.send(run);
        });

        let client = StreamerbotClient::connect(&options).await.unwrap();
        assert!(client.is_connected());
        let invoker = ActionInvoker::new(Arc::new(client));
        let outcome = invoker
            .invoke(Some(&ActionTarget::Name("scene2".into())))
            .await
            .unwrap();
        assert_eq!(outcome.action_id, "abc");

        let run = seen_rx.await.unwrap();
        assert_eq!(run["request"], "DoAction");
        assert_eq!(run["action"]["id"], "abc");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_authenticates_with_challenge() {
        let (listener, options) = listen().await;
        let options = ClientOptions {
            password: "hunter2".into(),
            ..options
        };

        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            send_json(
                &mut ws,
                hello(Some(json!({ "salt": "s4lt", "challenge": "ch4llenge" }))),
            )
            .await;
            let auth = recv_json(&mut ws).await;
            assert_eq!(auth["request"], "Authenticate");
            assert_eq!(
                auth["authentication"],
                authentication_token("hunter2", "s4lt", "ch4llenge")
            );
            send_json(&mut ws, json!({ "id": auth["id"], "status": "ok" })).await;

            let run = recv_json(&mut ws).await;
            send_json(&mut ws, json!({ "id": run["id"], "status": "ok" })).await;
        });

        let client = StreamerbotClient::connect(&options).await.unwrap();
        client.do_action("abc").await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_authentication() {
        let (listener, options) = listen().await;
        let options = ClientOptions {
            password: "wrong".into(),
            ..options
        };

        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            send_json(&mut ws, hello(Some(json!({ "salt": "a", "challenge": "b" })))).await;
            let auth = recv_json(&mut ws).await;
            send_json(
                &mut ws,
                json!({ "id": auth["id"], "status": "error", "error": "Authentication failed" }),
            )
            .await;
        });

        let err = StreamerbotClient::connect(&options).await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication(ref m) if m == "Authentication failed"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_password_fails_fast() {
        let (listener, options) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            send_json(&mut ws, hello(Some(json!({ "salt": "a", "challenge": "b" })))).await;
            // Wait for the client to hang up.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let err = StreamerbotClient::connect(&options).await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (listener, options) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            send_json(&mut ws, hello(None)).await;
            let run = recv_json(&mut ws).await;
            send_json(
                &mut ws,
                json!({ "id": run["id"], "status": "error", "error": "Action not found" }),
            )
            .await;
        });

        let client = StreamerbotClient::connect(&options).await.unwrap();
        let err = client.do_action("missing").await.unwrap_err();
        assert!(matches!(err, ClientError::Request { ref message, .. } if message == "Action not found"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_server_close_disconnects() {
        let (listener, options) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            send_json(&mut ws, hello(None)).await;
            ws.close(None).await.unwrap();
        });

        let client = StreamerbotClient::connect(&options).await.unwrap();
        server.await.unwrap();

        for _ in 0..100 {
            if !client.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!client.is_connected());
        assert!(matches!(
            client.do_action("abc").await,
            Err(ClientError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_reconnects_after_server_restart() {
        let (listener, options) = listen().await;
        let options = ClientOptions {
            reconnect_delay: Some(Duration::from_millis(10)),
            ..options
        };

        let server = tokio::spawn(async move {
            let mut first = accept(&listener).await;
            send_json(&mut first, hello(None)).await;
            first.close(None).await.unwrap();
            drop(first);

            let mut second = accept(&listener).await;
            send_json(&mut second, hello(None)).await;
            let run = recv_json(&mut second).await;
            send_json(&mut second, json!({ "id": run["id"], "status": "ok" })).await;
            while let Some(Ok(_)) = second.next().await {}
            run
        });

        let client = StreamerbotClient::connect(&options).await.unwrap();
        let mut ran = false;
        for _ in 0..200 {
            if client.do_action("abc").await.is_ok() {
                ran = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ran, "client never reconnected");
        assert!(client.is_connected());
        drop(client);
        let run = server.await.unwrap();
        assert_eq!(run["action"]["id"], "abc");
    }

    #[tokio::test]
    async fn test_background_connect() {
        let (listener, options) = listen().await;
        let client = StreamerbotClient::connect_in_background(&ClientOptions {
            reconnect_delay: Some(Duration::from_millis(10)),
            ..options
        });
        assert!(!client.is_connected());

        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            send_json(&mut ws, hello(None)).await;
            let run = recv_json(&mut ws).await;
            send_json(&mut ws, json!({ "id": run["id"], "status": "ok" })).await;
            while let Some(Ok(_)) = ws.next().await {}
        });

        for _ in 0..200 {
            if client.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(client.is_connected());
        client.do_action("abc").await.unwrap();
        drop(client);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_background_connect_gives_up_on_rejected_password() {
        let (listener, options) = listen().await;
        let client = StreamerbotClient::connect_in_background(&ClientOptions {
            password: "wrong".into(),
            reconnect_delay: Some(Duration::from_millis(10)),
            ..options
        });

        let mut ws = accept(&listener).await;
        send_json(&mut ws, hello(Some(json!({ "salt": "a", "challenge": "b" })))).await;
        let auth = recv_json(&mut ws).await;
        send_json(
            &mut ws,
            json!({ "id": auth["id"], "status": "error", "error": "Authentication failed" }),
        )
        .await;

        for _ in 0..100 {
            if client.requests.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!client.is_connected());
        assert!(matches!(
            client.do_action("abc").await,
            Err(ClientError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let (listener, options) = listen().await;
        drop(listener);
        let err = StreamerbotClient::connect(&options).await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }
}
