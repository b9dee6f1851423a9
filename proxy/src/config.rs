use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ProxyConfig {
    /// Address the proxy listens on
    #[arg(long, env = "PROXY_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Conversation backend base URL
    #[arg(long, env = "FASTAPI_BASE_URL", default_value = "http://localhost:8000")]
    pub backend_url: String,

    /// Bot REST webhook
    #[arg(
        long,
        env = "BOT_URL",
        default_value = "http://localhost:5005/webhooks/rest/webhook"
    )]
    pub bot_url: String,

    /// Built client bundle served for every non-API path
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl ProxyConfig {
    pub fn backend(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.backend_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
