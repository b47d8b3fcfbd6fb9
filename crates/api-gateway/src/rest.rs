//! REST server
//!
//! Binds the router to a socket and serves until the shutdown future
//! resolves.

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::routes::api_routes;
use crate::state::AppState;

/// HTTP front end of the classifier
pub struct RestApi {
    /// Listen address
    addr: SocketAddr,
    
    /// Fully layered router
    router: Router,
}

impl RestApi {
    /// Creates the server for `state`
    pub fn new(addr: SocketAddr, state: AppState, max_upload_bytes: usize) -> Self {
        Self {
            addr,
            router: api_routes(state, max_upload_bytes),
        }
    }
    
    /// Listen address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
    
    /// Serves requests until `shutdown` completes
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = axum::Server::try_bind(&self.addr)
            .with_context(|| format!("failed to bind {}", self.addr))?;
        
        info!("Listening on http://{}", self.addr);
        
        server
            .serve(self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server error")?;
        
        info!("Server stopped");
        Ok(())
    }
}
