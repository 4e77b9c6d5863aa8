use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::models::{ClientMessage, ServerMessage};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection is not open")]
    NotOpen,
    #[error("websocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("cannot encode message: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Link between a client sync agent and the session server. Handed to the agent at
/// construction; the agent decides when it is opened and closed.
#[async_trait]
pub trait Connection: Send {
    async fn open(&mut self) -> Result<(), ConnectionError>;

    async fn send(&mut self, message: &ClientMessage) -> Result<(), ConnectionError>;

    /// Next message from the server, or `None` once the server has closed the connection.
    async fn recv(&mut self) -> Result<Option<ServerMessage>, ConnectionError>;

    async fn close(&mut self) -> Result<(), ConnectionError>;

    fn is_open(&self) -> bool;
}

/// JSON-over-websocket connection to the `/ws` endpoint.
pub struct WsConnection {
    url: String,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WsConnection {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), stream: None }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn open(&mut self) -> Result<(), ConnectionError> {
        let (stream, _response) = connect_async(self.url.as_str()).await?;
        info!("Connected to {}", self.url);
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<(), ConnectionError> {
        let stream = self.stream.as_mut().ok_or(ConnectionError::NotOpen)?;
        let text = serde_json::to_string(message)?;
        stream.send(Message::text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<ServerMessage>, ConnectionError> {
        loop {
            let frame = match self.stream.as_mut() {
                Some(stream) => stream.next().await,
                None => return Err(ConnectionError::NotOpen),
            };
            match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str(text.as_str()) {
                    Ok(message) => return Ok(Some(message)),
                    Err(e) => warn!("Ignoring unreadable server message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Server closed {}", self.url);
                    self.stream = None;
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(e.into());
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        if let Some(mut stream) = self.stream.take() {
            match stream.close(None).await {
                Ok(())
                | Err(tungstenite::Error::ConnectionClosed)
                | Err(tungstenite::Error::AlreadyClosed) => {}
                Err(e) => return Err(e.into()),
            }
            info!("Closed connection to {}", self.url);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
