//! Normalized request keys
//!
//! The Cache Store and the Queue Store identify a request by the same
//! canonical (method, URL) pair, so lookups never miss on incidental
//! differences like query ordering or a trailing slash.

use reqwest::Method;
use sha2::{Digest, Sha256};

/// Canonical identity of a request: uppercase method + normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    canonical_url: String,
}

impl RequestKey {
    /// Build a key from a method and a URL (absolute or same-origin path)
    pub fn new(method: &Method, url: &str) -> Self {
        Self {
            method: method.as_str().to_uppercase(),
            canonical_url: canonicalize(url),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Hex-encoded SHA-256 digest used as the storage key
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"|");
        hasher.update(self.canonical_url.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Normalize a URL: drop the fragment, sort query components, trim a
/// trailing slash (except for the bare root path).
///
/// Query components are sorted as raw `k=v` strings; they are never decoded
/// or re-encoded, so percent-encoding survives untouched.
pub fn canonicalize(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => {
            let mut out = format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or(""));
            if let Some(port) = parsed.port() {
                out.push_str(&format!(":{port}"));
            }
            out.push_str(&trim_trailing_slash(parsed.path()));
            if let Some(query) = parsed.query() {
                push_sorted_query(&mut out, query);
            }
            out
        }
        Err(_) => {
            // Same-origin path form: "/path?query#fragment"
            let without_fragment = url.split('#').next().unwrap_or("");
            let mut parts = without_fragment.splitn(2, '?');
            let path = parts.next().unwrap_or("");
            let mut out = trim_trailing_slash(path);
            if let Some(query) = parts.next() {
                push_sorted_query(&mut out, query);
            }
            out
        }
    }
}

fn trim_trailing_slash(path: &str) -> String {
    if path.len() > 1 && path.ends_with('/') {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

fn push_sorted_query(out: &mut String, query: &str) {
    if query.is_empty() {
        return;
    }
    let mut components: Vec<&str> = query.split('&').collect();
    components.sort_unstable();
    out.push('?');
    out.push_str(&components.join("&"));
}
