use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    required_message, MemberSchema, INVALID_DOB, INVALID_EMAIL, INVALID_GENDER, INVALID_PHONE,
    INVALID_ZIP, PHONE_DIGITS,
};
use crate::domain::{Gender, MemberField};

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("valid regex"));
static ISO_DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid regex"));

fn digits_only(raw: &str) -> String {
    NON_DIGIT.replace_all(raw, "").into_owned()
}

/// Trimmed value of a free-text field; empty is a violation
pub fn normalize_required(field: MemberField, raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(required_message(field));
    }
    Ok(value.to_string())
}

/// Strict `YYYY-MM-DD`: the shape must match before the calendar check runs,
/// so `2000-1-5` or `01/05/2000` are rejected even though they name real dates.
pub fn normalize_dob(raw: &str) -> Result<NaiveDate, String> {
    let value = raw.trim();
    if !ISO_DATE_SHAPE.is_match(value) {
        return Err(INVALID_DOB.to_string());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| INVALID_DOB.to_string())
}

pub fn normalize_gender(schema: &MemberSchema, raw: &str) -> Result<Gender, String> {
    Gender::from_code(&raw.trim().to_uppercase())
        .filter(|gender| schema.allowed_genders.contains(gender))
        .ok_or_else(|| INVALID_GENDER.to_string())
}

/// Strip everything but digits and render as `DDD-DDD-DDDD`
pub fn normalize_phone(raw: &str) -> Result<String, String> {
    let digits = digits_only(raw);
    if digits.len() != PHONE_DIGITS {
        return Err(INVALID_PHONE.to_string());
    }
    Ok(format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]))
}

/// Strip everything but digits; exactly `zip_digits` must remain
pub fn normalize_zip5(schema: &MemberSchema, raw: &str) -> Result<String, String> {
    let digits = digits_only(raw);
    if digits.len() != schema.zip_digits {
        return Err(INVALID_ZIP.to_string());
    }
    Ok(digits)
}

/// Optional: empty means "not provided"
pub fn normalize_email(raw: &str) -> Result<Option<String>, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if !value.contains('@') {
        return Err(INVALID_EMAIL.to_string());
    }
    Ok(Some(value.to_string()))
}
