//! Realtime session connection

use futures::stream::{SplitSink, SplitStream};
use futures::{Stream, StreamExt, future};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        handshake::client::generate_key,
        http::Request,
        http::header::{AUTHORIZATION, USER_AGENT},
        protocol::Message,
    },
};
use tracing::{debug, info};

use crate::config::RealtimeConfig;
use crate::core::relay::error::{Leg, RelayError, RelayResult};

pub type RealtimeSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type RealtimeSink = SplitSink<RealtimeSocket, Message>;
pub type RealtimeStream = SplitStream<RealtimeSocket>;

/// Beta header required by the realtime API
pub const OPENAI_BETA_HEADER: &str = "realtime=v1";

/// Build the websocket handshake request for the configured endpoint
pub fn build_request(config: &RealtimeConfig) -> RelayResult<Request<()>> {
    let url = config
        .endpoint()
        .map_err(|e| RelayError::Connect(format!("invalid realtime URL: {e}")))?;
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(RelayError::Connect("realtime URL has no host".to_string())),
    };

    Request::builder()
        .method("GET")
        .uri(url.as_str())
        .header("Host", host)
        .header("Upgrade", "websocket")
        .header("Connection", "upgrade")
        .header("Sec-WebSocket-Key", generate_key())
        .header("Sec-WebSocket-Version", "13")
        .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
        .header("OpenAI-Beta", OPENAI_BETA_HEADER)
        .header(USER_AGENT, concat!("callrelay/", env!("CARGO_PKG_VERSION")))
        .body(())
        .map_err(|e| RelayError::Connect(format!("failed to create request: {e}")))
}

/// Open the realtime session, bounded by the configured connect timeout
pub async fn connect(config: &RealtimeConfig) -> RelayResult<RealtimeSocket> {
    let request = build_request(config)?;
    debug!(uri = %request.uri(), "Connecting to realtime session");

    let (socket, response) = timeout(config.connect_timeout, connect_async(request))
        .await
        .map_err(|_| RelayError::ConnectTimeout(config.connect_timeout))?
        .map_err(|e| RelayError::Connect(e.to_string()))?;

    info!(status = ?response.status(), "Realtime session connected");
    Ok(socket)
}

/// Text frames of the realtime session; a close frame ends the stream
pub fn text_frames(stream: RealtimeStream) -> impl Stream<Item = RelayResult<String>> {
    stream
        .take_while(|message| future::ready(!matches!(message, Ok(Message::Close(_)))))
        .filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(_) => None,
                Err(e) => Some(Err(RelayError::transport(Leg::Realtime, e))),
            })
        })
}

/// Wrap an encoded event as a websocket frame
pub fn into_frame(text: String) -> Message {
    Message::Text(text.into())
}

pub fn close_frame() -> Message {
    Message::Close(None)
}
