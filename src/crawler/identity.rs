//! Per-request browser-like identity
//!
//! Each request gets a user agent drawn with replacement from a fixed pool,
//! plus a constant set of ordinary browser headers. This only lowers the odds
//! of being fingerprinted; nothing depends on it for correctness.

use crate::config::DEFAULT_USER_AGENTS;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, REFERER,
    USER_AGENT,
};

const ACCEPT_VALUE: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";
const ACCEPT_ENCODING_VALUE: &str = "gzip, br";

/// Picks one user agent from the pool
///
/// An empty pool yields the first built-in agent, so sampling never blocks
/// or fails.
pub fn pick_user_agent<'a, R: Rng + ?Sized>(rng: &mut R, pool: &'a [String]) -> &'a str {
    if pool.is_empty() {
        return DEFAULT_USER_AGENTS[0];
    }
    let index = rng.gen_range(0..pool.len());
    &pool[index]
}

/// Builds the header set for one request
pub fn request_headers<R: Rng + ?Sized>(rng: &mut R, pool: &[String], referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let agent = HeaderValue::from_str(pick_user_agent(rng, pool))
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENTS[0]));
    headers.insert(USER_AGENT, agent);

    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(ACCEPT_ENCODING_VALUE));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    if let Ok(referer) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, referer);
    }

    headers
}
