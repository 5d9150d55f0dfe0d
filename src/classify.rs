//! Request classification
//!
//! Pure mapping from (method, path) to a resource class; the class picks the
//! fetch strategy and the cache namespace. No hidden state, no I/O.

use reqwest::Method;

/// Extensions treated as static assets
pub const STATIC_EXTENSIONS: [&str; 7] = ["html", "js", "css", "png", "jpg", "svg", "ico"];

/// Resource class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// Any non-read method, regardless of path
    Write,
    /// Read under the API root
    ApiRead,
    /// Read of a static asset (by extension)
    StaticRead,
    /// Everything else
    OtherRead,
}

impl RequestClass {
    /// Classify a request by method and path.
    ///
    /// `api_root` is the path prefix of the REST layer (e.g. `/api`).
    pub fn from_request(method: &Method, path: &str, api_root: &str) -> Self {
        if !is_read_method(method) {
            return RequestClass::Write;
        }

        if under_api_root(path, api_root) {
            return RequestClass::ApiRead;
        }

        if has_static_extension(path) {
            return RequestClass::StaticRead;
        }

        RequestClass::OtherRead
    }
}

fn is_read_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn under_api_root(path: &str, api_root: &str) -> bool {
    let root = api_root.trim_end_matches('/');
    path == root || path.starts_with(&format!("{root}/"))
}

fn has_static_extension(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(_, ext)| STATIC_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Category tag for a queued mutation, taken from the first path segment
/// under the API root (`/api/alerts/123` → `alerts`).
pub fn category_for_path(path: &str, api_root: &str) -> String {
    let root = api_root.trim_end_matches('/');
    path.strip_prefix(root)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .map(|rest| rest.trim_start_matches('/'))
        .and_then(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("other")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_methods_always_write() {
        for method in [Method::POST, Method::PATCH, Method::PUT, Method::DELETE] {
            assert_eq!(
                RequestClass::from_request(&method, "/index.html", "/api"),
                RequestClass::Write
            );
            assert_eq!(
                RequestClass::from_request(&method, "/api/alerts", "/api"),
                RequestClass::Write
            );
        }
    }

    #[test]
    fn test_api_reads() {
        assert_eq!(
            RequestClass::from_request(&Method::GET, "/api/alerts", "/api"),
            RequestClass::ApiRead
        );
        assert_eq!(
            RequestClass::from_request(&Method::HEAD, "/api/sightings/42", "/api"),
            RequestClass::ApiRead
        );
        assert_eq!(
            RequestClass::from_request(&Method::GET, "/api", "/api"),
            RequestClass::ApiRead
        );
    }

    #[test]
    fn test_api_prefix_must_be_a_segment() {
        // /apiary is not under /api
        assert_eq!(
            RequestClass::from_request(&Method::GET, "/apiary/bees", "/api"),
            RequestClass::OtherRead
        );
    }

    #[test]
    fn test_static_reads() {
        for path in [
            "/index.html",
            "/app.js",
            "/styles.css",
            "/icons/icon-192.png",
            "/photo.jpg",
            "/map.svg",
            "/favicon.ico",
        ] {
            assert_eq!(
                RequestClass::from_request(&Method::GET, path, "/api"),
                RequestClass::StaticRead,
                "path: {path}"
            );
        }
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(
            RequestClass::from_request(&Method::GET, "/photo.JPG", "/api"),
            RequestClass::StaticRead
        );
    }

    #[test]
    fn test_other_reads() {
        assert_eq!(
            RequestClass::from_request(&Method::GET, "/dashboard", "/api"),
            RequestClass::OtherRead
        );
        assert_eq!(
            RequestClass::from_request(&Method::GET, "/", "/api"),
            RequestClass::OtherRead
        );
        assert_eq!(
            RequestClass::from_request(&Method::GET, "/report.pdf", "/api"),
            RequestClass::OtherRead
        );
    }

    #[test]
    fn test_category_from_path() {
        assert_eq!(category_for_path("/api/alerts", "/api"), "alerts");
        assert_eq!(category_for_path("/api/sightings/42", "/api"), "sightings");
        assert_eq!(category_for_path("/api/", "/api"), "other");
        assert_eq!(category_for_path("/upload", "/api"), "other");
        // A prefix match without a segment boundary is not the API root
        assert_eq!(category_for_path("/apiary/bees", "/api"), "other");
    }
}
