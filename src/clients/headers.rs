//! Per-attempt request context and the headers derived from it.

use std::collections::HashMap;
use std::fmt;

/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "Content-Type";
/// `Authorization` header name.
pub const AUTHORIZATION: &str = "Authorization";
/// App version header name.
pub const APP_VERSION: &str = "X-App-Version";
/// Platform header name.
pub const PLATFORM: &str = "X-Platform";
/// Request id header name.
pub const REQUEST_ID: &str = "X-Request-ID";

const JSON: &str = "application/json";

/// Everything needed to build the headers of one attempt.
///
/// Built fresh for every attempt from the credential store and the request
/// id generator; never persisted. The `Debug` output masks the
/// authorization value.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Trace id of this attempt.
    pub request_id: String,
    /// Platform identifier.
    pub platform: String,
    /// App version string.
    pub app_version: String,
    /// `Bearer <token>`, when an access token is stored.
    pub auth_header: Option<String>,
}

impl RequestContext {
    /// Creates a context; `access_token` becomes a bearer header when present.
    #[must_use]
    pub fn new(
        request_id: String,
        platform: impl Into<String>,
        app_version: impl Into<String>,
        access_token: Option<&str>,
    ) -> Self {
        Self {
            request_id,
            platform: platform.into(),
            app_version: app_version.into(),
            auth_header: access_token.map(|token| format!("Bearer {token}")),
        }
    }

    /// Returns the outbound headers for this attempt.
    ///
    /// `Authorization` is omitted entirely when there is no token.
    #[must_use]
    pub fn to_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(CONTENT_TYPE.to_string(), JSON.to_string());
        headers.insert(APP_VERSION.to_string(), self.app_version.clone());
        headers.insert(PLATFORM.to_string(), self.platform.clone());
        headers.insert(REQUEST_ID.to_string(), self.request_id.clone());
        if let Some(auth) = &self.auth_header {
            headers.insert(AUTHORIZATION.to_string(), auth.clone());
        }
        headers
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("platform", &self.platform)
            .field("app_version", &self.app_version)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "Bearer *****"))
            .finish()
    }
}
