//! HTTP query API over the reading store.

mod error;
mod handlers;

use std::net::SocketAddr;

use actix_web::dev::Server;
use actix_web::{web::Data, App, HttpServer};
use store::SqliteStore;
use tracing::info;

pub use error::ApiError;
pub use handlers::routes;

/// Bind the API and return the running server
///
/// Signal handling is left to the caller; stop it through `Server::handle`.
pub fn start(store: SqliteStore, addr: SocketAddr) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(store.clone()))
            .configure(routes)
    })
    .bind(addr)?
    .disable_signals()
    .run();

    info!(%addr, "Query API listening");
    Ok(server)
}
