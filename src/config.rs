use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Settings shared by the admin web front and the console.
///
/// Every flag falls back to an environment variable, then to a default that
/// suits a local catalog API.
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Category administration for the store catalog")]
pub struct AdminConfig {
    /// Address the admin web front listens on
    #[arg(long, env = "CATALOG_ADMIN_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Base URL of the catalog API serving /api/admin/catalog/categories
    #[arg(long, env = "CATALOG_API_URL", default_value = "http://127.0.0.1:8080")]
    pub upstream: String,

    /// Per-request timeout for catalog API calls, in seconds
    #[arg(long = "timeout-secs", env = "CATALOG_API_TIMEOUT", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Browse a saved snapshot instead of the catalog API (console only)
    #[arg(long)]
    pub offline: Option<PathBuf>,
}

impl AdminConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = AdminConfig::try_parse_from([
            "website",
            "--listen",
            "0.0.0.0:9000",
            "--upstream",
            "http://catalog:8080",
            "--timeout-secs",
            "3",
        ])
        .unwrap();

        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.upstream, "http://catalog:8080");
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert!(config.offline.is_none());
    }

    #[test]
    fn defaults_come_from_the_flag_definitions() {
        let config = AdminConfig::try_parse_from(["console"]).unwrap();

        if std::env::var_os("CATALOG_ADMIN_LISTEN").is_none() {
            assert_eq!(config.listen, SocketAddr::from(([127, 0, 0, 1], 3000)));
        }
        if std::env::var_os("CATALOG_API_TIMEOUT").is_none() {
            assert_eq!(config.timeout(), Duration::from_secs(10));
        }
        assert!(config.offline.is_none());
    }

    #[test]
    fn rejects_bad_listen_address() {
        assert!(AdminConfig::try_parse_from(["website", "--listen", "nowhere"]).is_err());
    }
}
