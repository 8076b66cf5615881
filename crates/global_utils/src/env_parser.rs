use std::net::{IpAddr, SocketAddr};
use std::{env, io};

use dns_lookup::lookup_host;
use thiserror::Error;
use tracing::debug;

/// Pins the configuration to exactly one file instead of the merged
/// base/variant pair.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

#[derive(Debug, Error)]
pub enum EnvParserError {
    #[error("cannot resolve listen host {host}: {source}")]
    Resolve { host: String, source: io::Error },
    #[error("listen host {0} resolves to no address")]
    NoAddress(String),
}

/// The operator-pinned config file path, if `CONFIG_PATH` is set and
/// non-empty.
pub fn config_path_from_env() -> Option<String> {
    env::var(CONFIG_PATH_ENV).ok().filter(|path| !path.trim().is_empty())
}

/// Turns the configured listen host into a bind address. Literal IPs are
/// used as-is; names (container service names, mostly) go through the
/// resolver and the first answer wins.
pub fn resolve_bind_addr(host: &str, port: u16) -> Result<SocketAddr, EnvParserError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    let answers = lookup_host(host).map_err(|source| EnvParserError::Resolve {
        host: host.to_string(),
        source,
    })?;
    let addr = answers
        .into_iter()
        .next()
        .map(|ip| SocketAddr::new(ip, port))
        .ok_or_else(|| EnvParserError::NoAddress(host.to_string()))?;
    debug!(%host, %addr, "resolved listen host");
    Ok(addr)
}
