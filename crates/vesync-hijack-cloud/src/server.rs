use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::{Method, Uri};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use chrono::Local;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, warn, Level};

use crate::assets::StaticAssets;
use crate::connection::{DeviceSocketConnection, Inbound, Outbound};
use crate::error::{CloudError, Result};

/// Default HTTP + WebSocket port.
pub const HTTP_PORT: u16 = 17273;

/// Path the device opens its command channel on.
pub const WEBSOCKET_PATH: &str = "/gnws";

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub bind: SocketAddr,
    pub assets_dir: PathBuf,
    pub websocket_path: String,
    /// Origin devices are told to fetch firmware from.
    pub upgrade_url: String,
}

#[derive(Clone)]
struct AppState {
    assets: Arc<StaticAssets>,
    upgrade_url: Arc<str>,
}

/// Build the HTTP router: the command channel at `websocket_path`, static
/// assets everywhere else.
pub fn router(assets: StaticAssets, websocket_path: &str, upgrade_url: &str) -> Router {
    let state = AppState {
        assets: Arc::new(assets),
        upgrade_url: Arc::from(upgrade_url),
    };

    Router::new()
        .route(websocket_path, any(command_channel))
        .fallback(static_file)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Bound HTTP + WebSocket listener.
pub struct CloudServer {
    listener: TcpListener,
    router: Router,
}

impl CloudServer {
    pub async fn bind(config: CloudConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|source| CloudError::Bind {
                addr: config.bind,
                source,
            })?;
        let router = router(
            StaticAssets::new(config.assets_dir),
            &config.websocket_path,
            &config.upgrade_url,
        );
        Ok(Self { listener, router })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `cancel` fires.
    pub async fn serve(self, cancel: CancellationToken) -> Result<()> {
        info!(addr = %self.listener.local_addr()?, "starting web server");
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
        Ok(())
    }
}

async fn static_file(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    state.assets.respond(&method, uri.path()).await
}

/// Upgrades to the command channel; anything that is not a WebSocket
/// handshake is treated like any other static request.
async fn command_channel(
    ws: Option<WebSocketUpgrade>,
    remote: Option<ConnectInfo<SocketAddr>>,
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Response {
    let Some(ws) = ws else {
        return state.assets.respond(&method, uri.path()).await;
    };
    let remote = remote.map(|ConnectInfo(remote)| remote);
    info!(remote = ?remote, "accepted WebSocket");
    ws.on_upgrade(move |socket| run_command_channel(socket, remote, state.upgrade_url))
}

async fn run_command_channel(
    mut socket: WebSocket,
    remote: Option<SocketAddr>,
    upgrade_url: Arc<str>,
) {
    let mut connection = DeviceSocketConnection::new(&*upgrade_url);

    while let Some(received) = socket.recv().await {
        let inbound = match received {
            Ok(Message::Text(text)) => Inbound::Text(text),
            Ok(Message::Binary(data)) => Inbound::Binary(data),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(remote = ?remote, error = %err, "WebSocket receive failed");
                break;
            }
        };

        let replies = match connection.handle(inbound, &Local::now()) {
            Ok(replies) => replies,
            Err(err) => {
                warn!(remote = ?remote, error = %err, "dropping device message");
                continue;
            }
        };

        for reply in replies {
            let message = match reply {
                Outbound::Text(text) => Message::Text(text),
                Outbound::Binary(data) => Message::Binary(data),
            };
            if let Err(err) = socket.send(message).await {
                warn!(remote = ?remote, error = %err, "WebSocket send failed");
                return;
            }
        }
    }

    info!(remote = ?remote, upgraded = connection.upgrade_sent(), "WebSocket closed");
}
