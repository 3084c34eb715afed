/// Get environment variable with FLOODGATE_ prefix, falling back to unprefixed version
///
/// Checks `FLOODGATE_{key}` first, then `{key}`, so deployments that already
/// export e.g. `PAY2_API_KEY` keep working.
///
/// # Examples
///
/// ```rust,ignore
/// // Checks FLOODGATE_PAY2_API_KEY first, then PAY2_API_KEY
/// let key = get_env_with_prefix("PAY2_API_KEY");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("FLOODGATE_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Parse a boolean flag the way operators tend to write them
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
