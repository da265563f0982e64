// Configuration - Environment variables

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Server configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (ROUTINES_ADDR)
    pub addr: SocketAddr,
    /// Directory holding one JSON file per stored collection (ROUTINES_DATA_DIR)
    pub data_dir: PathBuf,
    /// Static frontend served at `/` (ROUTINES_STATIC_DIR)
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Unparseable values fall back to defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr: SocketAddr = ([127, 0, 0, 1], 3000).into();
        let addr = match lookup("ROUTINES_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("ROUTINES_ADDR `{}` is not a socket address, using {}", raw, DEFAULT_ADDR);
                default_addr
            }),
            None => default_addr,
        };

        Self {
            addr,
            data_dir: lookup("ROUTINES_DATA_DIR").unwrap_or_else(|| "data".into()).into(),
            static_dir: lookup("ROUTINES_STATIC_DIR").unwrap_or_else(|| "static".into()).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset() {
        let c = Config::from_lookup(|_| None);
        assert_eq!(c.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(c.data_dir, PathBuf::from("data"));
        assert_eq!(c.static_dir, PathBuf::from("static"));
    }

    #[test]
    fn reads_overrides_and_ignores_bad_addr() {
        let vars: HashMap<&str, &str> = [
            ("ROUTINES_ADDR", "0.0.0.0:8080"),
            ("ROUTINES_DATA_DIR", "/tmp/routines"),
        ]
        .into();
        let c = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(c.addr.port(), 8080);
        assert_eq!(c.data_dir, PathBuf::from("/tmp/routines"));

        let c = Config::from_lookup(|k| (k == "ROUTINES_ADDR").then(|| "nonsense".to_string()));
        assert_eq!(c.addr.to_string(), DEFAULT_ADDR);
    }
}
