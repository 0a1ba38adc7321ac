//! Query API (spec §4.6/§6): read-only JSON-over-POST handlers over the
//! Store. Deliberately just the two endpoints spec.md names — the teacher's
//! much larger `api/` surface (blocks, masternodes, governance, search,
//! xpub, websockets) served a full block explorer and has no counterpart in
//! this spec's scope.

mod height;
mod types;
mod utxo;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::node_client::NodeClient;
use crate::store::Store;

pub use height::get_height;
pub use types::{ApiResponse, ErrorBody, HeightData, UtxoData, UtxoEntry, UtxoRequest};
pub use utxo::get_utxos;

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    crate::metrics::gather().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub fn build_router(store: Arc<Store>, node: Arc<dyn NodeClient>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/height", post(get_height))
        .route("/utxo", post(get_utxos))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(axum::extract::Extension(store))
        .layer(axum::extract::Extension(node))
}
