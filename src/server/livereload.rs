// src/server/livereload.rs

//! Live-reload push channel.
//!
//! Browsers subscribe with `EventSource` to [`LIVE_RELOAD_PATH`] and receive
//! one `reload` event per [`ReloadSignal`](crate::types::ReloadSignal). The
//! client side is a small script injected into every served HTML page.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use super::ServerState;

pub const LIVE_RELOAD_PATH: &str = "/__sitepipe/livereload";

pub const LIVE_RELOAD_SCRIPT: &str = concat!(
    "<script>(function(){",
    "var es=new EventSource(\"/__sitepipe/livereload\");",
    "es.addEventListener(\"reload\",function(){window.location.reload();});",
    "})();</script>"
);

/// Insert the client script before the last `</body>`, or append it when the
/// page has no body tag.
pub fn inject_script(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + LIVE_RELOAD_SCRIPT.len());
            out.push_str(&html[..idx]);
            out.push_str(LIVE_RELOAD_SCRIPT);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{LIVE_RELOAD_SCRIPT}"),
    }
}

/// SSE endpoint: one stream per connected client.
pub async fn events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let reload_rx = state.reload.subscribe();
    let closing_rx = state.closing.clone();
    debug!(clients = state.reload.receiver_count(), "live-reload client connected");

    let stream = stream::unfold(
        (reload_rx, closing_rx),
        |(mut reload_rx, mut closing_rx)| async move {
            loop {
                tokio::select! {
                    res = reload_rx.recv() => match res {
                        // A lagging client missed signals; one reload covers them.
                        Ok(_) | Err(RecvError::Lagged(_)) => {
                            let event = Event::default().event("reload").data("reload");
                            return Some((Ok::<Event, Infallible>(event), (reload_rx, closing_rx)));
                        }
                        Err(RecvError::Closed) => return None,
                    },
                    changed = closing_rx.changed() => {
                        if changed.is_err() || *closing_rx.borrow() {
                            return None;
                        }
                    }
                }
            }
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}
