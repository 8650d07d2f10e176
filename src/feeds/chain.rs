//! Option-chain acquisition with a cascading fallback.
//!
//! One invocation walks an ordered candidate list -- the direct endpoint,
//! then each CORS relay wrapping it -- strictly sequentially, first success
//! wins. Exhaustion degrades to a synthetic placeholder chain so the caller
//! always has renderable data. Nothing here propagates an error; repeated
//! failures across invocations are the caller's concern.

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Days, Utc};
use smallvec::SmallVec;

/// Well-known CORS relays, tried in order after the direct attempt.
const PROXY_PREFIXES: [&str; 3] = [
    "https://api.allorigins.win/raw?url=",
    "https://thingproxy.freeboard.io/fetch/",
    "https://cors.bridged.cc/",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMethod {
    Direct,
    Proxy(String),
    FallbackSample,
}

impl std::fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Proxy(prefix) => write!(f, "proxy:{prefix}"),
            Self::FallbackSample => write!(f, "fallback-sample"),
        }
    }
}

impl serde::Serialize for FetchMethod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of one fetch invocation. Not persisted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FetchOutcome {
    pub method: FetchMethod,
    pub url: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub error: Option<String>,
}

pub struct ChainFetcher {
    client: reqwest::Client,
}

impl ChainFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch the chain for `symbol`. Never returns an error: every failure
    /// path ends in the placeholder chain carrying the last error message.
    pub async fn fetch_chain(
        &self,
        primary_url: &str,
        symbol: &str,
        proxy_fallback: bool,
    ) -> FetchOutcome {
        let mut last_error = String::from("fetch failed");

        for (method, url) in candidates(primary_url, symbol, proxy_fallback) {
            match self.try_fetch(&url).await {
                Ok(payload) => {
                    tracing::info!(method = %method, "chain fetch succeeded");
                    return FetchOutcome {
                        method,
                        url: Some(url),
                        payload: Some(payload),
                        error: None,
                    };
                }
                Err(e) => {
                    tracing::warn!(method = %method, error = %e, "chain fetch attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        FetchOutcome {
            method: FetchMethod::FallbackSample,
            url: None,
            payload: Some(sample_chain(Utc::now())),
            error: Some(last_error),
        }
    }

    async fn try_fetch(&self, url: &str) -> AppResult<serde_json::Value> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Network(format!("HTTP {status}")));
        }
        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| AppError::Parse(format!("GET {url}: {e}")))
    }
}

/// Ordered attempt list: direct target first, then each relay wrapping the
/// encoded target. At most four entries.
fn candidates(primary_url: &str, symbol: &str, proxy_fallback: bool) -> SmallVec<[(FetchMethod, String); 4]> {
    let target = with_symbol(primary_url, symbol);
    let mut out: SmallVec<[(FetchMethod, String); 4]> = SmallVec::new();
    out.push((FetchMethod::Direct, target.clone()));
    if proxy_fallback {
        for prefix in PROXY_PREFIXES {
            out.push((
                FetchMethod::Proxy(prefix.to_string()),
                format!("{prefix}{}", encode_component(&target)),
            ));
        }
    }
    out
}

/// Append the symbol query parameter, respecting an existing query string.
fn with_symbol(base_url: &str, symbol: &str) -> String {
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{sep}symbol={}", encode_component(symbol))
}

/// Percent-encode a URI component (RFC 3986 unreserved set plus the extras
/// the relays expect to stay literal).
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Placeholder chain served when every source is exhausted: "no live data",
/// but still renderable.
pub fn sample_chain(now: DateTime<Utc>) -> serde_json::Value {
    let expiry = now
        .checked_add_days(Days::new(7))
        .unwrap_or(now)
        .format("%Y-%m-%d")
        .to_string();
    serde_json::json!({
        "symbol": "BANKNIFTY",
        "underlying": 58123.45,
        "expiryDates": [expiry],
        "optionData": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_appended_with_question_mark() {
        assert_eq!(
            with_symbol("https://x.example/chain", "NIFTY"),
            "https://x.example/chain?symbol=NIFTY"
        );
    }

    #[test]
    fn test_symbol_appended_with_ampersand() {
        assert_eq!(
            with_symbol("https://x.example/chain?v=2", "NIFTY"),
            "https://x.example/chain?v=2&symbol=NIFTY"
        );
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("BANKNIFTY"), "BANKNIFTY");
        assert_eq!(
            encode_component("https://x.example/a?b=c&d=e"),
            "https%3A%2F%2Fx.example%2Fa%3Fb%3Dc%26d%3De"
        );
    }

    #[test]
    fn test_candidate_order_direct_then_proxies() {
        let c = candidates("https://x.example/chain", "NIFTY", true);
        assert_eq!(c.len(), 4);
        assert_eq!(c[0].0, FetchMethod::Direct);
        for (i, prefix) in PROXY_PREFIXES.iter().enumerate() {
            assert_eq!(c[i + 1].0, FetchMethod::Proxy(prefix.to_string()));
            assert!(c[i + 1].1.starts_with(prefix));
            assert!(c[i + 1].1.contains("symbol%3DNIFTY"));
        }
    }

    #[test]
    fn test_fallback_disabled_tries_direct_only() {
        let c = candidates("https://x.example/chain", "NIFTY", false);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].0, FetchMethod::Direct);
    }

    #[test]
    fn test_method_tags() {
        assert_eq!(FetchMethod::Direct.to_string(), "direct");
        assert_eq!(
            FetchMethod::Proxy("https://p.example/".into()).to_string(),
            "proxy:https://p.example/"
        );
        assert_eq!(FetchMethod::FallbackSample.to_string(), "fallback-sample");
    }

    #[test]
    fn test_sample_chain_shape() {
        let now = Utc::now();
        let chain = sample_chain(now);
        assert_eq!(chain["symbol"], "BANKNIFTY");
        assert_eq!(chain["underlying"], 58123.45);
        assert_eq!(chain["optionData"].as_array().unwrap().len(), 0);
        assert_eq!(chain["expiryDates"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_cascade_serves_sample() {
        // unroutable local endpoint, no proxies: the cascade must exhaust and
        // degrade to the placeholder with a non-empty error
        let fetcher = ChainFetcher::new();
        let outcome = fetcher
            .fetch_chain("http://127.0.0.1:9/option-chain", "BANKNIFTY", false)
            .await;
        assert_eq!(outcome.method, FetchMethod::FallbackSample);
        assert!(outcome.url.is_none());
        assert!(!outcome.error.unwrap().is_empty());
        assert_eq!(outcome.payload.unwrap()["symbol"], "BANKNIFTY");
    }
}
