//! Record validation: raw roster row in, canonical member or every violation out.
//!
//! Validation runs in two phases. The gate checks the identity fields
//! (`member_id`, `first_name`, `last_name`) and, if any is empty, reports only
//! those. Otherwise every field goes through its normalizer and all violations
//! are collected.

use std::fmt;

use crate::domain::{MemberField, NormalizedMember, RawRow};
use crate::pipeline::processing::normalize::{
    normalize_dob, normalize_email, normalize_gender, normalize_phone, normalize_required,
    normalize_zip5, required_message, MemberSchema,
};

/// One violated rule on one field, rendered as `field: message`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: MemberField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: MemberField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate and normalize one raw row.
///
/// Deterministic and free of side effects.
pub fn validate(schema: &MemberSchema, raw: &RawRow) -> Result<NormalizedMember, Vec<FieldError>> {
    let value = |field: MemberField| raw.field(field).unwrap_or("").trim();

    // Phase 1: identity gate
    let gate_errors: Vec<FieldError> = schema
        .gate_fields
        .iter()
        .filter(|field| value(**field).is_empty())
        .map(|field| FieldError::new(*field, required_message(*field)))
        .collect();
    if !gate_errors.is_empty() {
        return Err(gate_errors);
    }

    // Phase 2: full schema, every field checked
    let mut errors = Vec::new();
    let member_id = collect(
        &mut errors,
        MemberField::MemberId,
        normalize_required(MemberField::MemberId, value(MemberField::MemberId)),
    );
    let first_name = collect(
        &mut errors,
        MemberField::FirstName,
        normalize_required(MemberField::FirstName, value(MemberField::FirstName)),
    );
    let last_name = collect(
        &mut errors,
        MemberField::LastName,
        normalize_required(MemberField::LastName, value(MemberField::LastName)),
    );
    let dob = collect(&mut errors, MemberField::Dob, normalize_dob(value(MemberField::Dob)));
    let gender = collect(
        &mut errors,
        MemberField::Gender,
        normalize_gender(schema, value(MemberField::Gender)),
    );
    let phone = collect(
        &mut errors,
        MemberField::Phone,
        normalize_phone(value(MemberField::Phone)),
    );
    let zip5 = collect(
        &mut errors,
        MemberField::Zip5,
        normalize_zip5(schema, value(MemberField::Zip5)),
    );
    let plan_id = collect(
        &mut errors,
        MemberField::PlanId,
        normalize_required(MemberField::PlanId, value(MemberField::PlanId)),
    );
    let email = collect(
        &mut errors,
        MemberField::Email,
        normalize_email(value(MemberField::Email)),
    );

    let (
        Some(member_id),
        Some(first_name),
        Some(last_name),
        Some(dob),
        Some(gender),
        Some(phone),
        Some(zip5),
        Some(plan_id),
        Some(email),
    ) = (
        member_id, first_name, last_name, dob, gender, phone, zip5, plan_id, email,
    )
    else {
        return Err(errors);
    };

    Ok(NormalizedMember {
        member_id,
        first_name,
        last_name,
        dob,
        gender,
        phone,
        email,
        zip5,
        plan_id,
    })
}

fn collect<T>(
    errors: &mut Vec<FieldError>,
    field: MemberField,
    result: Result<T, String>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(message) => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

/// Validator bound to a schema, shared by every row of a batch
#[derive(Debug, Clone, Default)]
pub struct RecordValidator {
    schema: MemberSchema,
}

impl RecordValidator {
    pub fn new(schema: MemberSchema) -> Self {
        Self { schema }
    }

    pub fn validate(&self, raw: &RawRow) -> Result<NormalizedMember, Vec<FieldError>> {
        validate(&self.schema, raw)
    }
}
