/// Parse a comma-separated origin list. Blank entries are ignored.
///
/// An empty result means any origin is allowed.
pub fn allowed_origins_from_env_value(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}
