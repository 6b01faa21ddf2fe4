use crate::config::ProtocolConfig;

/// Validate a requested display name and return its trimmed form.
pub fn validate_display_name_with_config(
    name: &str,
    config: &ProtocolConfig,
) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Display name cannot be empty".to_string());
    }
    if trimmed.chars().count() > config.max_display_name_length {
        return Err(format!(
            "Display name too long (max {} characters)",
            config.max_display_name_length
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err("Display name contains control characters".to_string());
    }
    Ok(trimmed.to_string())
}
