//! AI-actions endpoint server command — `taskcanvas serve`.

use anyhow::Result;

use taskcanvas::config::Config;
use taskcanvas::server;

pub async fn cmd_serve(port: Option<u16>) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    server::serve(&config).await
}
