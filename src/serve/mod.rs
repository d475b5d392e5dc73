// src/serve/mod.rs

//! `connect`: a static file server over the destination directory.
//!
//! The server runs on its own thread (rouille is synchronous). Binding
//! happens in [`start`], so a port that is already taken surfaces as an
//! error before the task reports progress.

use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;

use anyhow::{Result, anyhow};
use rouille::{Request, Response, Server};
use tracing::{debug, info};

/// Running server. Dropping the handle stops it.
pub struct ServerHandle {
    addr: SocketAddr,
    stop: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

impl ServerHandle {
    /// The bound address (useful when binding port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop the server and wait for its thread to exit.
    pub fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
            debug!(addr = %self.addr, "server stop requested");
        }
    }
}

/// Bind `addr` and start serving files from `root`.
pub fn start(root: &Path, addr: &str) -> Result<ServerHandle> {
    let root: PathBuf = root.to_path_buf();
    let handler_root = root.clone();

    let server = Server::new(addr, move |request| {
        let response = handle_request(&handler_root, request);
        debug!(
            method = %request.method(),
            url = %request.url(),
            status = response.status_code,
            "request"
        );
        response
    })
    .map_err(|e| anyhow!("binding {addr}: {e}"))?;

    let bound = server.server_addr();
    info!(addr = %bound, root = %root.display(), "server listening");

    let (thread, stop) = server.stoppable();
    Ok(ServerHandle {
        addr: bound,
        stop: Some(stop),
        thread: Some(thread),
    })
}

/// Map a request onto a file under `root`.
///
/// - Existing files are returned verbatim with a MIME type from their
///   extension.
/// - Directory URLs (`/`, `/docs/`) serve their `index.html`.
/// - Anything else, including paths with `..`, is a 404.
pub fn handle_request(root: &Path, request: &Request) -> Response {
    let url = request.url();
    if url.split('/').any(|segment| segment == "..") {
        return Response::empty_404();
    }

    let response = rouille::match_assets(request, root);
    if response.is_success() {
        return response;
    }

    if request.method() == "GET" && url.ends_with('/') {
        let index = root.join(url.trim_start_matches('/')).join("index.html");
        if let Ok(file) = File::open(&index) {
            return Response::from_file(rouille::extension_to_mime("html"), file);
        }
    }

    Response::empty_404()
}
