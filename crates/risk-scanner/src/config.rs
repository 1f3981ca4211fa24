use risk_engine::EngineConfig;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
///
/// Engine thresholds come from `EngineConfig::from_env`; see there for the
/// `RISK_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    /// TCP address to serve MCP on instead of stdio (e.g. "127.0.0.1:7400").
    pub tcp_listen_addr: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `MCP_TCP_LISTEN_ADDR`: serve on TCP instead of stdio
    /// - `RISK_*`: engine thresholds and catalog path
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine = EngineConfig::from_lookup(&lookup)?;

        let tcp_listen_addr = match lookup("MCP_TCP_LISTEN_ADDR") {
            Some(addr) if addr.trim().is_empty() => None,
            Some(addr) => {
                let addr = addr.trim().to_string();
                if !addr.contains(':') {
                    return Err(AppError::Config(format!(
                        "MCP_TCP_LISTEN_ADDR must be host:port, got '{addr}'"
                    )));
                }
                Some(addr)
            }
            None => None,
        };

        Ok(Self {
            engine,
            tcp_listen_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdio_by_default() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert!(config.tcp_listen_addr.is_none());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn tcp_address_is_validated() {
        let config = Config::from_lookup(|key| {
            (key == "MCP_TCP_LISTEN_ADDR").then(|| " 127.0.0.1:7400 ".to_string())
        })
        .unwrap();
        assert_eq!(config.tcp_listen_addr.as_deref(), Some("127.0.0.1:7400"));

        let err = Config::from_lookup(|key| {
            (key == "MCP_TCP_LISTEN_ADDR").then(|| "localhost".to_string())
        })
        .err()
        .unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn engine_errors_pass_through() {
        let err = Config::from_lookup(|key| {
            (key == "RISK_MAX_EVIDENCE").then(|| "0".to_string())
        })
        .err()
        .unwrap();
        assert!(matches!(err, AppError::Engine(_)));
    }
}
