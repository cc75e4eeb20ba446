//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! These tests drive a running server over HTTP and are `#[ignore]`d by
//! default. To run them:
//!
//! ```bash
//! # Start PostgreSQL, migrate, and start the API
//! cargo run -p bazaar-cli -- migrate
//! cargo run -p bazaar-api &
//!
//! # Run the ignored tests
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! `BAZAAR_TEST_BASE_URL` overrides the default `http://localhost:8000`.

use reqwest::Client;
use serde_json::Value;

/// Base URL for the API under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("BAZAAR_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// An HTTP client bound to one cookie jar, plus the CSRF token it fetched.
///
/// Each context is an independent "browser": its session and CSRF cookies
/// do not leak into other contexts.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub csrf_token: String,
}

impl TestContext {
    /// Create a context and fetch a CSRF token for it.
    ///
    /// # Panics
    ///
    /// Panics if the server is unreachable or the token endpoint misbehaves;
    /// these tests require a running API.
    pub async fn new() -> Self {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("failed to create HTTP client");
        let base_url = base_url();

        let response = client
            .get(format!("{base_url}/auth/csrf-token"))
            .send()
            .await
            .expect("GET /auth/csrf-token failed; is the API running?");
        assert!(response.status().is_success());

        let body: Value = response.json().await.expect("csrf-token body is JSON");
        let csrf_token = body["csrf_token"]
            .as_str()
            .expect("csrf_token field present")
            .to_string();

        Self {
            client,
            base_url,
            csrf_token,
        }
    }

    /// POST JSON with the CSRF header attached.
    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header("x-csrf-token", &self.csrf_token)
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    /// PUT JSON with the CSRF header attached.
    pub async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(format!("{}{path}", self.base_url))
            .header("x-csrf-token", &self.csrf_token)
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    /// GET a path with the cookie jar.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("request failed")
    }
}

/// A unique suffix for email/username fixtures, derived from the clock.
#[must_use]
pub fn unique_suffix() -> String {
    format!(
        "{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos()
    )
}
