//! Error taxonomy (spec §7).
//!
//! `ScriptSkip` has no variant here — an unextractable vout is represented
//! as `Ok(None)` at the call site and logged at `debug`, never propagated as
//! an error. `ClientError` (malformed HTTP request bodies) is handled
//! directly at the axum layer with a 400 response and likewise never
//! reaches these types.

use thiserror::Error;

/// Failure reading from the node's JSON-RPC endpoint. Retried up to 3 times
/// per block by the Scanner; if all attempts fail the scan loop retries the
/// whole height without advancing `scan_height`.
#[derive(Debug, Error)]
pub enum TransientRemoteError {
    #[error("rpc transport error: {0}")]
    Transport(String),
    #[error("rpc returned an error response: {0}")]
    RpcError(String),
    #[error("unexpected rpc response shape: {0}")]
    BadShape(String),
}

/// A corrupt on-disk record or a key-schema violation. Always fatal: either
/// a bug or disk corruption, never something a retry can fix.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed key: {0}")]
    Key(String),
    #[error("protobuf decode failed: {0}")]
    Protobuf(#[from] prost::DecodeError),
    #[error("decimal string malformed: {0}")]
    Decimal(String),
}

/// Derived state disagrees with itself (e.g. a UTXO record's address
/// disagrees with its membership in an address's UTXO set). Fatal on the
/// scan/store path; surfaced to the caller (not the process) on the query
/// path.
#[derive(Debug, Error)]
#[error("data integrity violation: {0}")]
pub struct DataIntegrityError(pub String);

/// The Store's atomic commit failed. Fatal: the caller aborts the process
/// rather than attempt a partial recovery, since retrying without external
/// reconciliation risks double-applying a block on the next restart.
#[derive(Debug, Error)]
#[error("commit failed: {0}")]
pub struct CommitError(pub String);

/// Top-level error type threading through the ingest pipeline (Scanner,
/// Storer, Mutation Planner). Anything that reaches here and is not a
/// `Transient` variant is treated as fatal by the caller.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error(transparent)]
    Transient(#[from] TransientRemoteError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error("rocksdb error: {0}")]
    Store(#[from] rocksdb::Error),
}
