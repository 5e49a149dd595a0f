//! Field normalizers and the member schema they enforce.
//!
//! Every normalizer is a pure, total function from a trimmed-or-not raw value to
//! either its canonical form or a human-readable message. Absent values are
//! passed in as `""`.

pub mod fields;

pub use fields::{
    normalize_dob, normalize_email, normalize_gender, normalize_phone, normalize_required,
    normalize_zip5,
};

use crate::domain::{Gender, MemberField};

pub const INVALID_DOB: &str = "Invalid DOB format, expected YYYY-MM-DD";
pub const INVALID_GENDER: &str = "Invalid gender, must be M/F/O";
pub const INVALID_PHONE: &str = "Invalid phone number: must have 10 digits";
pub const INVALID_ZIP: &str = "Invalid zip code: must have 5 digits";
pub const INVALID_EMAIL: &str = "Invalid email format";

/// North American numbers only; the canonical form is `XXX-XXX-XXXX`
pub const PHONE_DIGITS: usize = 10;

/// `"<field> is required"`
pub fn required_message(field: MemberField) -> String {
    format!("{} is required", field)
}

/// Schema rules, passed explicitly to the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSchema {
    /// Fields checked before anything else; any failure short-circuits the row
    pub gate_fields: Vec<MemberField>,
    pub allowed_genders: Vec<Gender>,
    pub zip_digits: usize,
}

impl Default for MemberSchema {
    fn default() -> Self {
        Self {
            gate_fields: vec![
                MemberField::MemberId,
                MemberField::FirstName,
                MemberField::LastName,
            ],
            allowed_genders: vec![Gender::Male, Gender::Female, Gender::Other],
            zip_digits: 5,
        }
    }
}
