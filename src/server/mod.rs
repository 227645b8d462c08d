// src/server/mod.rs

//! Development HTTP server.
//!
//! Serves the output directory as static files and, with live reload on,
//! pushes a `reload` event to every connected browser whenever a task
//! writes output. Binding is separate from serving so a port conflict
//! surfaces before any build work starts.

pub mod livereload;
pub mod static_files;

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::config::model::ConfigFile;
use crate::errors::{Result, SitepipeError};
use crate::types::ReloadSender;

pub use livereload::LIVE_RELOAD_PATH;

/// Where and how to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served at `/`.
    pub root: PathBuf,
    pub live_reload: bool,
}

impl DevServerConfig {
    pub fn from_config(cfg: &ConfigFile, project_root: &Path) -> Self {
        let server = cfg.server_section();
        Self {
            host: server.host.clone(),
            port: server.port,
            root: server.root_dir(project_root, &cfg.config_section().out_dir),
            live_reload: server.live_reload,
        }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    root: Arc<PathBuf>,
    live_reload: bool,
    reload: ReloadSender,
    /// Flips to `true` on shutdown so open live-reload streams end.
    closing: watch::Receiver<bool>,
}

/// A dev server bound to its port but not yet accepting requests.
#[derive(Debug)]
pub struct DevServer {
    listener: TcpListener,
    router: Router,
    addr: SocketAddr,
    closing: watch::Sender<bool>,
}

impl DevServer {
    /// Bind the listening socket. Fails with [`SitepipeError::ServerBind`]
    /// when the address is taken or invalid.
    pub async fn bind(config: DevServerConfig, reload: ReloadSender) -> Result<Self> {
        let addr = config.addr();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| SitepipeError::ServerBind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener.local_addr()?;

        let (closing_tx, closing_rx) = watch::channel(false);
        let state = ServerState {
            root: Arc::new(config.root),
            live_reload: config.live_reload,
            reload,
            closing: closing_rx,
        };

        let mut router = Router::new();
        if config.live_reload {
            router = router.route(LIVE_RELOAD_PATH, get(livereload::events));
        }
        let router = router
            .fallback(static_files::serve_path)
            .with_state(state);

        Ok(Self {
            listener,
            router,
            addr: local,
            closing: closing_tx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accept requests until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %self.addr, "dev server listening on http://{}", self.addr);
        let closing = self.closing;
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let _ = closing.send(true);
            })
            .await?;
        info!("dev server stopped");
        Ok(())
    }
}
