//! Shared HTTP Client Module
//!
//! Provides a global, lazy-initialized HTTP client with connection pooling so
//! every requirements call reuses TLS sessions and idle connections.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Global HTTP client for generative-language API calls
///
/// No overall timeout is set here; a per-request timeout is applied by the
/// caller when one is configured.
pub static LLM_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .build()
        .unwrap_or_else(|e| {
            tracing::error!("[HttpClient] Failed to build pooled client: {}. Using defaults.", e);
            Client::new()
        })
});

/// Get the global generative-language HTTP client
#[inline]
pub fn llm_client() -> &'static Client {
    &LLM_CLIENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_created() {
        let _ = llm_client();
    }

    #[test]
    fn test_client_is_same_instance() {
        let client1 = llm_client();
        let client2 = llm_client();
        assert!(std::ptr::eq(client1, client2));
    }
}
