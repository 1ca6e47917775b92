//! Form validation helpers built on `validator`, producing the human
//! readable messages the forms show back to the user.

use std::borrow::Cow;

use time::{macros::format_description, PrimitiveDateTime};
use validator::{ValidationError, ValidationErrors};

pub fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "can't be blank"));
    }
    Ok(())
}

pub fn parse_positive_integer(value: &str) -> Result<i64, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(error("blank", "can't be blank"));
    }
    let number: i64 = value
        .parse()
        .map_err(|_| error("not_a_number", "is not a number"))?;
    if number <= 0 {
        return Err(error("greater_than", "must be greater than 0"));
    }
    Ok(number)
}

/// Accepts what a `datetime-local` input submits, with or without seconds.
pub fn parse_datetime_local(value: &str) -> Result<PrimitiveDateTime, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(error("blank", "can't be blank"));
    }
    let minutes = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    let seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(value, minutes)
        .or_else(|_| PrimitiveDateTime::parse(value, seconds))
        .map_err(|_| error("invalid", "is not a valid date and time"))
}

/// Flattens field errors into sentences like "Email address is invalid",
/// sorted so pages render them in a stable order.
pub fn messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_deref()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("is invalid ({})", error.code));
                format!("{} {message}", humanize(field))
            })
        })
        .collect();
    messages.sort();
    messages
}

fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}
