//! Request/response shapes for the Query API (spec §6).

use serde::{Deserialize, Serialize};

/// Envelope every JSON response is wrapped in, following the teacher's
/// `{ code, data }` convention.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { code: 0, data }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HeightData {
    pub store_height: i64,
    pub node_height: i64,
}

#[derive(Debug, Deserialize)]
pub struct UtxoRequest {
    pub address: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub page_size: usize,
}

#[derive(Debug, Serialize)]
pub struct UtxoEntry {
    pub tx_id: String,
    pub index: u32,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct UtxoData {
    pub balance: String,
    pub page: usize,
    pub page_size: usize,
    pub total_size: usize,
    pub utxos: Vec<UtxoEntry>,
}
