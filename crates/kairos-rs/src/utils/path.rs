//! URL construction for forwarding requests to an upstream replica.

/// Builds the outbound URL as `endpoint + path`, with the query string
/// preserved if non-empty.
///
/// # Examples
///
/// ```
/// use kairos_rs::utils::path::build_target_url;
///
/// assert_eq!(
///     build_target_url("http://127.0.0.1:9001", "/user-orch/hello", ""),
///     "http://127.0.0.1:9001/user-orch/hello"
/// );
/// assert_eq!(
///     build_target_url("http://127.0.0.1:9001/", "/user-orch/hello", "a=1"),
///     "http://127.0.0.1:9001/user-orch/hello?a=1"
/// );
/// ```
pub fn build_target_url(endpoint: &str, path: &str, query: &str) -> String {
    let mut url = format!("{}{}", endpoint.trim_end_matches('/'), path);
    if !query.is_empty() {
        url.push('?');
        url.push_str(query);
    }
    url
}
