//! Artifact lookup server.
//!
//! Binds the HTTP and WebSocket listeners, starts the actor runtime and
//! answers lookups from the coordinator's store.

mod lifecycle;
mod path;
mod response;

use crate::{
    actor::Coordinator,
    config::{ProjectConfig, cfg},
    debug,
    embed::CLIENT_JS_PATH,
    log,
    reload::server as ws_server,
};
use anyhow::{Context, Result};
use crossbeam::channel;
use path::Route;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use tiny_http::{Method, Request, Server};

/// Worker threads answering HTTP requests.
const REQUEST_THREADS: usize = 4;

/// Bound listeners ready to accept requests and sessions
pub struct BoundServer {
    server: Arc<Server>,
    ws_listener: TcpListener,
    ws_port: u16,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind both listeners without starting the request loop.
///
/// Ports are retried upward, so the reported addresses may differ from the
/// configured ones.
pub fn bind_server(config: &ProjectConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (ws_listener, ws_port) = ws_server::bind(config.serve.interface, config.serve.ws_port)?;

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    lifecycle::register_server_for_shutdown(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}", addr);
    log!("reload"; "ws://{}", SocketAddr::new(config.serve.interface, ws_port));
    debug!("serve"; "client script: http://{}{}", addr, CLIENT_JS_PATH);

    Ok(BoundServer {
        server,
        ws_listener,
        ws_port,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Start the actor runtime and the request loop (blocking).
    pub fn run(self) -> Result<()> {
        let config = cfg();
        let coordinator = Coordinator::shared(config.reload.retention());

        let actors = lifecycle::spawn_actors(
            Arc::clone(&coordinator),
            Arc::clone(&config),
            self.ws_listener,
            self.shutdown_rx,
        )?;

        let result = run_request_loop(&self.server, &coordinator, self.ws_port);

        coordinator.shutdown();
        lifecycle::wait_for_shutdown(actors);
        result
    }
}

fn run_request_loop(server: &Server, coordinator: &Arc<Coordinator>, ws_port: u16) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .thread_name(|i| format!("http-{i}"))
        .build()
        .context("failed to create request pool")?;

    for request in server.incoming_requests() {
        let coordinator = Arc::clone(coordinator);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &coordinator, ws_port) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, coordinator: &Coordinator, ws_port: u16) -> Result<()> {
    if crate::core::is_shutdown() || coordinator.is_shutdown() {
        return response::respond_unavailable(request);
    }

    if !matches!(request.method(), Method::Get | Method::Head) {
        return response::respond_method_not_allowed(request);
    }

    match Route::parse(request.url()) {
        Route::Manifest => response::respond_manifest(request, &coordinator.snapshot()),
        Route::Client => response::respond_client_js(request, ws_port),
        Route::Data(lookup) => match lookup.stamp.as_deref() {
            None => match coordinator.lookup(&lookup.name, None) {
                Some(version) if !lookup.map || version.map().is_some() => {
                    let location = lookup.location(version.stamp().as_str());
                    response::respond_redirect(request, &location)
                }
                _ => response::respond_not_found(request),
            },
            Some(stamp) => match coordinator.lookup(&lookup.name, Some(stamp)) {
                Some(version) => response::respond_version(request, &version, &lookup),
                None => response::respond_not_found(request),
            },
        },
        Route::NotFound => response::respond_not_found(request),
    }
}
