//! Runtime configuration, read once at startup from the environment.
//!
//! Every variable has a default, so an empty environment still produces
//! a usable configuration; only a malformed port value is an error.

use std::env;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

const SQLITE_PATH_VAR: &str = "ACSPS_SQLITE_PATH";
const UDP_BIND_ADDR_VAR: &str = "ACSPS_UDP_BIND_ADDR";
const UDP_BIND_PORT_VAR: &str = "ACSPS_UDP_BIND_PORT";
const HTTP_BIND_ADDR_VAR: &str = "ACSPS_HTTP_BIND_ADDR";
const HTTP_BIND_PORT_VAR: &str = "ACSPS_HTTP_BIND_PORT";

const DEFAULT_SQLITE_PATH: &str = "acsps.sqlite3";
const DEFAULT_UDP_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_UDP_BIND_PORT: u16 = 12000;
const DEFAULT_HTTP_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_HTTP_BIND_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not a valid IP address: {1}")]
    InvalidAddr(&'static str, String),
    #[error("{0} is not a valid port number: {1}")]
    InvalidPort(&'static str, String),
}

/// The sidecar's runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub sqlite_path: String,
    pub udp_bind: SocketAddr,
    pub http_bind: SocketAddr,
}

impl Config {
    /// Read configuration from the environment, falling back to
    /// defaults for any variable that's unset.
    pub fn from_env() -> Result<Config, ConfigError> {
        let sqlite_path =
            env::var(SQLITE_PATH_VAR).unwrap_or_else(|_| DEFAULT_SQLITE_PATH.to_owned());

        let udp_addr = parse_addr(UDP_BIND_ADDR_VAR, DEFAULT_UDP_BIND_ADDR)?;
        let udp_port = parse_port(UDP_BIND_PORT_VAR, DEFAULT_UDP_BIND_PORT)?;
        let http_addr = parse_addr(HTTP_BIND_ADDR_VAR, DEFAULT_HTTP_BIND_ADDR)?;
        let http_port = parse_port(HTTP_BIND_PORT_VAR, DEFAULT_HTTP_BIND_PORT)?;

        Ok(Config {
            sqlite_path,
            udp_bind: SocketAddr::new(udp_addr, udp_port),
            http_bind: SocketAddr::new(http_addr, http_port),
        })
    }
}

fn parse_addr(var: &'static str, default: &str) -> Result<IpAddr, ConfigError> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_owned());
    raw.parse()
        .map_err(|_| ConfigError::InvalidAddr(var, raw))
}

fn parse_port(var: &'static str, default: u16) -> Result<u16, ConfigError> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidPort(var, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global, so tests that touch them
    // must not run concurrently with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_vars() {
        for var in [
            SQLITE_PATH_VAR,
            UDP_BIND_ADDR_VAR,
            UDP_BIND_PORT_VAR,
            HTTP_BIND_ADDR_VAR,
            HTTP_BIND_PORT_VAR,
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_apply_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        let config = Config::from_env().unwrap();
        assert_eq!(config.sqlite_path, DEFAULT_SQLITE_PATH);
        assert_eq!(config.udp_bind.port(), DEFAULT_UDP_BIND_PORT);
        assert_eq!(config.http_bind.port(), DEFAULT_HTTP_BIND_PORT);
        clear_vars();
    }

    #[test]
    fn overrides_are_honoured() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        env::set_var(UDP_BIND_PORT_VAR, "9999");
        env::set_var(SQLITE_PATH_VAR, "/tmp/custom.sqlite3");
        let config = Config::from_env().unwrap();
        assert_eq!(config.udp_bind.port(), 9999);
        assert_eq!(config.sqlite_path, "/tmp/custom.sqlite3");
        clear_vars();
    }

    #[test]
    fn malformed_port_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        env::set_var(UDP_BIND_PORT_VAR, "not-a-port");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_, _)));
        clear_vars();
    }
}
