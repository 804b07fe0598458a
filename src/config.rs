//! Configuration for wharf
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;

/// Wharf - state-reconciliation engine for a device marketplace ledger
#[derive(Parser, Debug, Clone)]
#[command(name = "wharf")]
#[command(about = "Reconciles marketplace ledger state into a live membership graph")]
pub struct Args {
    /// Content-address gateway base URL (IPFS HTTP API)
    #[arg(long, env = "GATEWAY_URL", default_value = "http://localhost:5001")]
    pub gateway_url: String,

    /// Ledger JSON-RPC endpoint for marketplace read calls
    #[arg(long, env = "LEDGER_RPC_URL", default_value = "http://localhost:8545")]
    pub rpc_url: String,

    /// Ledger WebSocket endpoint for marketplace event subscriptions
    #[arg(long, env = "LEDGER_WS_URL", default_value = "ws://localhost:8546")]
    pub ws_url: String,

    /// Account address the session is scoped to
    #[arg(long, env = "ACCOUNT")]
    pub account: String,

    /// Request timeout in seconds for gateway and ledger calls
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate the configuration before the session is created.
    pub fn validate(&self) -> Result<(), String> {
        if self.account.trim().is_empty() {
            return Err("account must not be empty".to_string());
        }
        if !self.gateway_url.starts_with("http://") && !self.gateway_url.starts_with("https://") {
            return Err(format!("gateway URL must be http(s): {}", self.gateway_url));
        }
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(format!("ledger RPC URL must be http(s): {}", self.rpc_url));
        }
        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err(format!("ledger event URL must be ws(s): {}", self.ws_url));
        }
        if self.request_timeout_secs == 0 {
            return Err("request timeout must be non-zero".to_string());
        }
        Ok(())
    }
}
