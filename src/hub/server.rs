/// WebSocket endpoint for live subscribers
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::{CONTENT_TYPE, HOST};
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::Message;

use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::hub::subscribers::SubscriberId;

/// Longest body served for a wrong path
const NOT_FOUND_MAX: usize = 96;

/// Messages queued per subscriber before it is dropped as stalled
const OUTBOX_DEPTH: usize = 64;

/// Longest a single websocket write may block a connection task
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages from connection tasks to the scheduler
#[derive(Debug)]
pub enum HubCommand {
    Join {
        id: SubscriberId,
        outbox: mpsc::Sender<String>,
    },
    Request {
        id: SubscriberId,
        payload: String,
    },
    Leave {
        id: SubscriberId,
    },
}

#[derive(Debug)]
struct Route {
    path: String,
    name: String,
}

pub struct HubServer {
    listener: TcpListener,
    route: Arc<Route>,
    connections: Arc<Semaphore>,
    max_connections: usize,
}

impl HubServer {
    pub async fn bind(config: &HubConfig) -> HubResult<Self> {
        Self::bind_addr(
            &config.listen_addr,
            &config.ws_path,
            &config.hub_name,
            config.max_connections,
        )
        .await
    }

    pub async fn bind_addr(
        addr: &str,
        ws_path: &str,
        hub_name: &str,
        max_connections: usize,
    ) -> HubResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            route: Arc::new(Route {
                path: ws_path.to_string(),
                name: hub_name.to_string(),
            }),
            connections: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    pub fn local_addr(&self) -> HubResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the scheduler stops listening for commands
    pub async fn serve(self, commands: mpsc::Sender<HubCommand>) -> HubResult<()> {
        info!(
            "{} websocket listening on ws://{}{}",
            self.route.name,
            self.local_addr()?,
            self.route.path
        );

        let mut next_id = 0u64;
        loop {
            let accepted = tokio::select! {
                _ = commands.closed() => {
                    debug!("Scheduler gone, closing listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(connection) => connection,
                Err(e) => {
                    error!("Accept error: {}", e);
                    continue;
                }
            };

            let permit = match self.connections.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(
                        "Refusing connection from {}: {} connections already open",
                        peer, self.max_connections
                    );
                    continue;
                }
            };

            next_id += 1;
            let id = SubscriberId(next_id);
            let route = self.route.clone();
            let commands = commands.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer, id, route, commands, permit).await {
                    warn!("Connection {} from {} ended with error: {}", id, peer, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    id: SubscriberId,
    route: Arc<Route>,
    commands: mpsc::Sender<HubCommand>,
    _permit: OwnedSemaphorePermit,
) -> HubResult<()> {
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if request.uri().path() == route.path {
            return Ok(response);
        }
        let host = request
            .headers()
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        debug!("Rejecting upgrade to {} from {}", request.uri().path(), peer);
        Err(not_found(&route, host))
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            error!("Handshake with {} failed: {}", peer, e);
            return Err(e.into());
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let (outbox, mut outgoing) = mpsc::channel::<String>(OUTBOX_DEPTH);
    commands
        .send(HubCommand::Join { id, outbox })
        .await
        .map_err(|_| HubError::ChannelClosed("hub command"))?;
    info!("Subscriber {} connected from {}", id, peer);

    let result = loop {
        tokio::select! {
            message = outgoing.recv() => match message {
                Some(text) => {
                    match tokio::time::timeout(WRITE_TIMEOUT, write.send(Message::Text(text))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => break Err(e.into()),
                        Err(_) => break Err(HubError::WriteTimeout(id.to_string())),
                    }
                }
                // the scheduler dropped us, closed or stalled
                None => break Ok(()),
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(payload))) => {
                    if commands.send(HubCommand::Request { id, payload }).await.is_err() {
                        break Err(HubError::ChannelClosed("hub command"));
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let payload = String::from_utf8_lossy(&bytes).into_owned();
                    if commands.send(HubCommand::Request { id, payload }).await.is_err() {
                        break Err(HubError::ChannelClosed("hub command"));
                    }
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
            },
        }
    };

    // the scheduler may already be gone on shutdown
    let _ = commands.send(HubCommand::Leave { id }).await;
    info!("Subscriber {} disconnected", id);
    result
}

fn not_found(route: &Route, host: &str) -> ErrorResponse {
    let mut body = format!(
        "<h2>{}</h2>Use websocket to connect to {}{}",
        route.name, host, route.path
    );
    if body.len() > NOT_FOUND_MAX {
        warn!("Not-found page is {} bytes, truncating to {}", body.len(), NOT_FOUND_MAX);
        let mut end = NOT_FOUND_MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }

    let mut response = ErrorResponse::new(Some(body));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
    response
}
