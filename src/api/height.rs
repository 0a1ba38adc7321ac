//! `POST /height` — spec §6: combines the Store's durable height with a
//! live `get_block_count()` call against the node.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;

use crate::api::types::{ApiResponse, ErrorBody, HeightData};
use crate::node_client::NodeClient;
use crate::store::Store;

pub async fn get_height(
    Extension(store): Extension<Arc<Store>>,
    Extension(node): Extension<Arc<dyn NodeClient>>,
) -> Result<Json<ApiResponse<HeightData>>, (StatusCode, Json<ErrorBody>)> {
    let store_height = store.get_store_height().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                code: 500,
                message: format!("failed to read store height: {}", e),
            }),
        )
    })?;

    let node_height = tokio::task::spawn_blocking(move || node.get_block_count())
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    code: 500,
                    message: format!("node height task panicked: {}", e),
                }),
            )
        })?
        .map_err(|e| {
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    code: 502,
                    message: format!("failed to reach node: {}", e),
                }),
            )
        })?;

    Ok(Json(ApiResponse::ok(HeightData {
        store_height,
        node_height,
    })))
}
