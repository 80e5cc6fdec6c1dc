//! Small string helpers shared by config and the HTTP client

/// Check if a server value is an http(s) URL
///
/// Returns true for:
/// - `https://deploy.example.com`
/// - `http://localhost:8065/`
///
/// Returns false for bare hosts (`deploy.example.com`), other schemes
/// (`ftp://...`) and empty strings.
pub fn is_http_url(value: &str) -> bool {
  let value = value.trim();
  let rest = value
    .strip_prefix("https://")
    .or_else(|| value.strip_prefix("http://"));

  match rest {
    Some(host) => !host.is_empty() && !host.starts_with('/'),
    None => false,
  }
}

/// Strip surrounding whitespace and trailing slashes from a server URL
pub fn trim_server_url(value: &str) -> String {
  value.trim().trim_end_matches('/').to_string()
}

/// Pad a cell to a display width counted in chars
pub fn pad(value: &str, width: usize) -> String {
  let len = value.chars().count();
  if len >= width {
    value.to_string()
  } else {
    format!("{}{}", value, " ".repeat(width - len))
  }
}
