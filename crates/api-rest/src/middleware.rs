use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, header},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::{ApiError, AppState};
use api_shared::validate_authorization;

/// Request budget per client address.
pub(crate) type ClientLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Tracked addresses above which idle entries are dropped.
const LIMITER_SHRINK_AT: usize = 10_000;

/// Rejects mutating requests that carry no `Authorization` header.
///
/// Only active when the configuration requires auth. Reads are never checked.
pub(crate) async fn require_authorization(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.cfg.require_auth() && matches!(*req.method(), Method::POST | Method::DELETE) {
        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if let Err(e) = validate_authorization(header) {
            tracing::warn!("{} {} denied: {}", req.method(), req.uri().path(), e);
            return Err(ApiError::Forbidden);
        }
    }
    Ok(next.run(req).await)
}

/// Builds a limiter allowing `max_per_minute` requests per client address.
pub(crate) fn client_limiter(max_per_minute: u64) -> Arc<ClientLimiter> {
    let burst = NonZeroU32::new(u32::try_from(max_per_minute).unwrap_or(u32::MAX))
        .unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_minute(burst)))
}

/// Answers 429 once a client address has spent its per-minute budget.
///
/// Requests without connection info (in-process callers) share one budget.
pub(crate) async fn limit_per_client(
    State(limiter): State<Arc<ClientLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_ip(&req);
    if limiter.check_key(&client).is_err() {
        tracing::debug!("Rate limit reached for {}", client);
        return Err(ApiError::TooManyRequests);
    }
    if limiter.len() > LIMITER_SHRINK_AT {
        limiter.retain_recent();
    }
    Ok(next.run(req).await)
}

fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
