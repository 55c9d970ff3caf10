/// Upstream used when `TARGET_URL` is unset or empty.
pub const DEFAULT_TARGET_URL: &str = "http://127.0.0.1:8081";

/// Address used when `LISTEN` is unset.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub target_url: String,
    /// Tokens added per second to each client's bucket.
    pub rate: f64,
    /// Bucket capacity.
    pub burst: u32,
}

impl Config {
    pub fn load() -> Self {
        let listen_addr =
            std::env::var("LISTEN")
                .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let target_url = std::env::var("TARGET_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_URL.to_string());

        Self {
            listen_addr,
            target_url,
            rate: 1.0,
            burst: 1,
        }
    }
}
