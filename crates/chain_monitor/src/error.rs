use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("rpc transport failure: {0}")]
    Rpc(String),
    #[error("rpc returned error {code}: {message}")]
    RpcResponse { code: i64, message: String },
    #[error("malformed rpc payload: {0}")]
    MalformedResponse(String),
    #[error("undecodable log: {0}")]
    Decode(String),
    #[error("unknown chain: {0}")]
    UnknownChain(u32),
    #[error("monitor did not drain within the grace period")]
    DrainTimeout,
}
