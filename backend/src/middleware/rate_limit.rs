use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

// 10 requests per minute per IP for the credential endpoints
const MAX_REQUESTS: u32 = 10;
const WINDOW_DURATION: Duration = Duration::from_secs(60);

/// Rate limiting entry for tracking requests
#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

/// In-memory fixed-window rate limiter, shared through router state
/// (in production, use Redis)
#[derive(Clone, Default)]
pub struct RateLimiter {
    entries: Arc<RwLock<HashMap<String, RateLimitEntry>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a hit for the client and reports whether it is still within
    /// the window limit.
    async fn check(&self, client_ip: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        // Clean up expired entries
        entries.retain(|_, entry| now.duration_since(entry.window_start) <= WINDOW_DURATION);

        let entry = entries.entry(client_ip.to_string()).or_insert_with(|| RateLimitEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) > WINDOW_DURATION {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= MAX_REQUESTS
    }
}

/// Rate limiting middleware for the credential endpoints (signup and login)
pub async fn credential_rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Connect info is missing when the server is not bound to a socket
    // (e.g. in-process test transports); those share a single bucket.
    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string());

    if !limiter.check(&client_ip).await {
        tracing::warn!("Rate limit exceeded for IP: {}", client_ip);
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}
