//! URL utilities for building API endpoints from a configured base URL.

use reqwest::Url;

use crate::core::error::ChatError;

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use routechat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://openrouter.ai/api/v1"), "https://openrouter.ai/api/v1");
/// assert_eq!(normalize_base_url("https://openrouter.ai/api/v1///"), "https://openrouter.ai/api/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path without doubling slashes
///
/// # Examples
///
/// ```
/// use routechat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://openrouter.ai/api/v1/", "/chat/completions"),
///     "https://openrouter.ai/api/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Build and validate an endpoint URL.
///
/// Only absolute `http`/`https` URLs with a host are accepted; anything else is
/// a configuration problem rather than a network failure.
pub fn endpoint_url(base_url: &str, endpoint: &str) -> Result<Url, ChatError> {
    if normalize_base_url(base_url).is_empty() {
        return Err(ChatError::InvalidConfiguration(
            "base URL is empty".to_string(),
        ));
    }

    let joined = construct_api_url(base_url, endpoint);
    let url = Url::parse(&joined).map_err(|err| {
        ChatError::InvalidConfiguration(format!("invalid base URL '{base_url}': {err}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ChatError::InvalidConfiguration(format!(
            "base URL '{base_url}' must be an absolute http(s) URL"
        )));
    }

    Ok(url)
}
