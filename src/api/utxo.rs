//! `POST /utxo` — spec §6: paginated UTXO set and balance for an address.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;

use crate::api::types::{ApiResponse, ErrorBody, UtxoData, UtxoEntry, UtxoRequest};
use crate::codec::parse_ukey;
use crate::decimal::{decimal_from_f64, format_decimal8};
use crate::error::{DataIntegrityError, IndexerError};
use crate::store::Store;

const DEFAULT_PAGE_SIZE: usize = 50;

fn internal_error(message: String) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody { code: 500, message }),
    )
}

pub async fn get_utxos(
    Extension(store): Extension<Arc<Store>>,
    Json(req): Json<UtxoRequest>,
) -> Result<Json<ApiResponse<UtxoData>>, (StatusCode, Json<ErrorBody>)> {
    if req.address.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                code: 400,
                message: "address is required".to_string(),
            }),
        ));
    }
    let page_size = if req.page_size == 0 { DEFAULT_PAGE_SIZE } else { req.page_size };
    let page = req.page;

    let address = req.address.clone();
    let store_for_blocking = Arc::clone(&store);
    let result = tokio::task::spawn_blocking(move || -> Result<UtxoData, IndexerError> {
        let balance = store_for_blocking
            .get_address_balance(&address)?
            .unwrap_or(Decimal::ZERO);
        let mut keys: Vec<String> = store_for_blocking
            .get_address_utxo_set(&address)?
            .unwrap_or_default()
            .into_iter()
            .collect();
        keys.sort();
        let total_size = keys.len();

        let start = (page.saturating_mul(page_size)).min(total_size);
        let end = (start.saturating_add(page_size)).min(total_size);

        let mut utxos = Vec::with_capacity(end - start);
        for key in &keys[start..end] {
            let info = store_for_blocking.get_utxo_info(key)?.ok_or_else(|| {
                DataIntegrityError(format!("utxo set member {} has no utxo record", key))
            })?;
            if info.address != address {
                return Err(DataIntegrityError(format!(
                    "utxo {} address mismatch (set says {}, record says {})",
                    key, address, info.address
                ))
                .into());
            }
            let (txid, index) = parse_ukey(key)?;
            utxos.push(UtxoEntry {
                tx_id: txid,
                index,
                value: format_decimal8(decimal_from_f64(info.value)),
            });
        }

        Ok(UtxoData {
            balance: format_decimal8(balance),
            page,
            page_size,
            total_size,
            utxos,
        })
    })
    .await
    .map_err(|e| internal_error(format!("utxo query task panicked: {}", e)))?
    .map_err(|e| internal_error(e.to_string()))?;

    Ok(Json(ApiResponse::ok(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ukey, UtxoInfo};
    use crate::store::Store;
    use crate::write_set::WriteSet;
    use std::collections::HashSet;

    fn populate_125_utxos(store: &Store) {
        let mut ws = WriteSet::new(1);
        let mut members = HashSet::new();
        for i in 0..125u32 {
            let key = ukey("tx", i);
            ws.utxo_puts.insert(
                key.clone(),
                UtxoInfo {
                    address: "A".to_string(),
                    value: 0.00000001,
                    spend: None,
                },
            );
            members.insert(key);
        }
        ws.balance_puts.insert("A".to_string(), Decimal::new(125, 8));
        ws.address_set_puts.insert("A".to_string(), members);
        store.commit(&ws).unwrap();
    }

    #[tokio::test]
    async fn pagination_matches_scenario_4() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        populate_125_utxos(&store);

        let first = get_utxos(
            Extension(Arc::clone(&store)),
            Json(UtxoRequest {
                address: "A".to_string(),
                page: 0,
                page_size: 50,
            }),
        )
        .await
        .unwrap();
        assert_eq!(first.0.data.utxos.len(), 50);
        assert_eq!(first.0.data.total_size, 125);
        assert_eq!(first.0.data.balance, "0.00000125");

        let last = get_utxos(
            Extension(Arc::clone(&store)),
            Json(UtxoRequest {
                address: "A".to_string(),
                page: 2,
                page_size: 50,
            }),
        )
        .await
        .unwrap();
        assert_eq!(last.0.data.utxos.len(), 25);
        assert_eq!(last.0.data.total_size, 125);
    }

    #[tokio::test]
    async fn unknown_address_returns_zero_balance_and_empty_page() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());

        let resp = get_utxos(
            Extension(store),
            Json(UtxoRequest {
                address: "unknown".to_string(),
                page: 0,
                page_size: 50,
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.0.data.balance, "0.00000000");
        assert_eq!(resp.0.data.total_size, 0);
        assert!(resp.0.data.utxos.is_empty());
    }
}
