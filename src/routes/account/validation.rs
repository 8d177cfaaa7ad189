use crate::error::{AppError, AppResult};
use crate::session::Role;

/// Trimmed value of a required form field.
///
/// # Errors
///
/// Returns `AppError::Validation` if the field is blank.
pub fn required<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("'{field}' is required")));
    }
    Ok(trimmed)
}

/// # Errors
///
/// Returns `AppError::Validation` unless the value looks like `local@domain`.
pub fn email(value: &str) -> AppResult<&str> {
    let value = required("email", value)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {
            Ok(value)
        }
        _ => Err(AppError::Validation(format!("'{value}' is not a valid email address"))),
    }
}

/// Normalize a sensor id to upper-case, colon-separated MAC form.
///
/// Accepts `aa:bb:cc:dd:ee:ff`, `AA-BB-CC-DD-EE-FF` and `aabbccddeeff`.
///
/// # Errors
///
/// Returns `AppError::Validation` if the value is not six hex octets.
pub fn mac_address(value: &str) -> AppResult<String> {
    let value = required("mac_address", value)?;
    let invalid = || {
        AppError::Validation(format!(
            "'{value}' is not a valid device id (expected AA:BB:CC:DD:EE:FF)"
        ))
    };

    let hex: String = match value.len() {
        12 => value.to_string(),
        17 => {
            let bytes = value.as_bytes();
            let separator = bytes[2];
            let separated = (separator == b':' || separator == b'-')
                && (2..17).step_by(3).all(|i| bytes[i] == separator);
            if !separated {
                return Err(invalid());
            }
            value.split(char::from(separator)).collect()
        }
        _ => return Err(invalid()),
    };

    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let upper = hex.to_ascii_uppercase();
    let octets: Vec<&str> = (0..6).map(|i| &upper[i * 2..i * 2 + 2]).collect();
    Ok(octets.join(":"))
}

/// Strict role parsing for admin updates; unknown values are rejected rather
/// than defaulted.
///
/// # Errors
///
/// Returns `AppError::Validation` for anything but `operator` or `admin`.
pub fn role(value: &str) -> AppResult<Role> {
    match value.trim().to_lowercase().as_str() {
        "operator" => Ok(Role::Operator),
        "admin" => Ok(Role::Admin),
        other => Err(AppError::Validation(format!("Unknown role '{other}'"))),
    }
}
