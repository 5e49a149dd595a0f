//! Member roster domain shapes shared across the pipeline.
//!
//! - [`MemberField`] - the fixed set of roster columns the schema knows about
//! - [`RawRow`] - one input line, exactly as read from the client file
//! - [`NormalizedMember`] - the canonical record; only the validator builds one
//! - [`Gender`] - canonical gender code

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::constants;

/// Roster columns known to the member schema, in validation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberField {
    MemberId,
    FirstName,
    LastName,
    Dob,
    Gender,
    Phone,
    Zip5,
    PlanId,
    Email,
}

impl MemberField {
    pub const ALL: [MemberField; 9] = [
        MemberField::MemberId,
        MemberField::FirstName,
        MemberField::LastName,
        MemberField::Dob,
        MemberField::Gender,
        MemberField::Phone,
        MemberField::Zip5,
        MemberField::PlanId,
        MemberField::Email,
    ];

    /// Canonical column name
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberField::MemberId => constants::MEMBER_ID,
            MemberField::FirstName => constants::FIRST_NAME,
            MemberField::LastName => constants::LAST_NAME,
            MemberField::Dob => constants::DOB,
            MemberField::Gender => constants::GENDER,
            MemberField::Phone => constants::PHONE,
            MemberField::Email => constants::EMAIL,
            MemberField::Zip5 => constants::ZIP5,
            MemberField::PlanId => constants::PLAN_ID,
        }
    }

    /// Column names accepted for this field, canonical name first
    pub fn column_names(&self) -> &'static [&'static str] {
        match self {
            MemberField::Zip5 => &[constants::ZIP5, constants::ZIP_CODE_ALIAS],
            MemberField::MemberId => &[constants::MEMBER_ID],
            MemberField::FirstName => &[constants::FIRST_NAME],
            MemberField::LastName => &[constants::LAST_NAME],
            MemberField::Dob => &[constants::DOB],
            MemberField::Gender => &[constants::GENDER],
            MemberField::Phone => &[constants::PHONE],
            MemberField::Email => &[constants::EMAIL],
            MemberField::PlanId => &[constants::PLAN_ID],
        }
    }
}

impl fmt::Display for MemberField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One data line from a client roster.
///
/// Columns keep the order of the file's header. Cells the line did not
/// provide are simply absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based data line number (the header is not counted)
    line: usize,
    columns: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(line: usize, columns: Vec<(String, String)>) -> Self {
        Self { line, columns }
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<I, K, V>(line: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            line,
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    /// Raw value of a column by exact name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Raw value of a schema field, trying the canonical column before any alias
    pub fn field(&self, field: MemberField) -> Option<&str> {
        field
            .column_names()
            .iter()
            .find_map(|column| self.get(column))
    }

    /// JSON object rendering of the row, in header order
    pub fn to_json_string(&self) -> String {
        // Serializing string pairs into a map cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Canonical gender code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    /// Parse an already trimmed and uppercased code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            "O" => Some(Gender::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member record in canonical form.
///
/// Every field has been through its normalizer; the only way to obtain one
/// is [`crate::pipeline::processing::validate::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMember {
    pub(crate) member_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) dob: NaiveDate,
    pub(crate) gender: Gender,
    /// `XXX-XXX-XXXX`
    pub(crate) phone: String,
    pub(crate) email: Option<String>,
    /// Exactly five digits
    pub(crate) zip5: String,
    pub(crate) plan_id: String,
}

impl NormalizedMember {
    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn dob(&self) -> NaiveDate {
        self.dob
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn zip5(&self) -> &str {
        &self.zip5
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_code_alias_is_resolved() {
        let row = RawRow::from_pairs(1, [("member_id", "1"), ("zip_code", "94105")]);
        assert_eq!(row.field(MemberField::Zip5), Some("94105"));
    }

    #[test]
    fn test_canonical_zip_column_wins_over_alias() {
        let row = RawRow::from_pairs(1, [("zip_code", "11111"), ("zip5", "22222")]);
        assert_eq!(row.field(MemberField::Zip5), Some("22222"));
    }

    #[test]
    fn test_missing_column_is_absent() {
        let row = RawRow::from_pairs(1, [("member_id", "1")]);
        assert_eq!(row.field(MemberField::LastName), None);
    }

    #[test]
    fn test_row_json_keeps_header_order() {
        let row = RawRow::from_pairs(3, [("member_id", "7"), ("first_name", "Ann"), ("dob", "")]);
        assert_eq!(
            row.to_json_string(),
            r#"{"member_id":"7","first_name":"Ann","dob":""}"#
        );
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_code("F"), Some(Gender::Female));
        assert_eq!(Gender::from_code("X"), None);
        assert_eq!(Gender::Other.to_string(), "O");
    }
}
