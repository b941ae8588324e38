use chrono::{NaiveDate, NaiveTime};

pub const MAX_QUANTITY: i32 = 100;
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Trims a required text field
pub fn validate_required(field: &str, value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(trimmed.to_string())
}

/// Phone numbers are 10 to 15 digits, optionally with a leading `+` and
/// spaces or dashes between groups
pub fn validate_phone(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Phone number is required".to_string());
    }
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if !body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-') {
        return Err("Phone number may only contain digits".to_string());
    }
    let digits = body.chars().filter(char::is_ascii_digit).count();
    if !(10..=15).contains(&digits) {
        return Err("Phone number must have 10 to 15 digits".to_string());
    }
    Ok(trimmed.to_string())
}

pub fn validate_quantity(value: i32) -> Result<i32, String> {
    if value < 1 {
        return Err("Quantity must be at least 1".to_string());
    }
    if value > MAX_QUANTITY {
        return Err(format!("Quantity cannot exceed {MAX_QUANTITY}"));
    }
    Ok(value)
}

pub fn validate_rating(value: i32) -> Result<i32, String> {
    if !(1..=5).contains(&value) {
        return Err("Rating must be between 1 and 5".to_string());
    }
    Ok(value)
}

pub fn validate_price(value: f64) -> Result<f64, String> {
    if !value.is_finite() || value < 0.0 {
        return Err("Price must be a non-negative number".to_string());
    }
    Ok(value)
}

pub fn validate_stock(value: i32) -> Result<i32, String> {
    if value < 0 {
        return Err("Stock cannot be negative".to_string());
    }
    Ok(value)
}

pub fn validate_password(value: &str) -> Result<(), String> {
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` date
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid {field}: expected YYYY-MM-DD"))
}

/// Normalizes an `HH:MM` 24-hour time
pub fn validate_time(field: &str, value: &str) -> Result<String, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| format!("Invalid {field}: expected HH:MM"))
}
