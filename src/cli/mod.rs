//! Command-line flags for the server binary.

use clap::Parser;

use crate::config::ServerConfig;

/// Sustainability assistant proxy
#[derive(Parser, Debug, Default)]
#[command(name = "ecoclaim", version, about = "Chat and assistant proxy for carbon footprint tools")]
pub struct Cli {
    /// Interface to bind (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Cli {
    /// Apply flag overrides on top of the environment config.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
    }
}
