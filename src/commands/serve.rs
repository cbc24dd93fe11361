//! `formcraft serve`

use crate::config::Config;
use crate::error::Result;

/// Run the HTTP server, optionally overriding the bind address
pub async fn run_serve(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    crate::server::serve(&config).await
}
