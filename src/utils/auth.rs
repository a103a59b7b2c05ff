//! Header helpers for authenticating and identifying API requests.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};

use crate::core::error::ChatError;

/// `X-Title`
pub const TITLE_HEADER: HeaderName = HeaderName::from_static("x-title");
/// `HTTP-Referer`
pub const REFERER_HEADER: HeaderName = HeaderName::from_static("http-referer");

/// Add the bearer `Authorization` header.
///
/// A blank key is reported as missing; a key that cannot be encoded as a
/// header value is a configuration error.
pub fn add_auth_headers(headers: &mut HeaderMap, api_key: &str) -> Result<(), ChatError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(ChatError::ApiKeyMissing);
    }

    let mut value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
        ChatError::InvalidConfiguration("API key contains invalid header characters".to_string())
    })?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

/// Add the client identification headers the aggregator uses for attribution.
pub fn add_client_headers(
    headers: &mut HeaderMap,
    app_name: &str,
    referer: Option<&str>,
) -> Result<(), ChatError> {
    let user_agent = format!("{}/{}", app_name, env!("CARGO_PKG_VERSION"));
    headers.insert(USER_AGENT, header_value(&user_agent, "client name")?);
    headers.insert(TITLE_HEADER, header_value(app_name, "client name")?);

    if let Some(referer) = referer.map(str::trim).filter(|r| !r.is_empty()) {
        headers.insert(REFERER_HEADER, header_value(referer, "referer")?);
    }
    Ok(())
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue, ChatError> {
    HeaderValue::from_str(value)
        .map_err(|_| ChatError::InvalidConfiguration(format!("{what} is not a valid header value")))
}
