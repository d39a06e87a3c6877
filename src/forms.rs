//! Public consultation request form: cleaning, validation and conversion.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::{ConsultationKind, NewConsultationRequest};

pub const MSG_REQUIRED: &str = "این فیلد لازم است.";
pub const MSG_PHONE_PREFIX: &str = "شماره تماس باید با 09 یا 0 شروع شود.";
pub const MSG_PHONE_INVALID: &str = "شماره تماس نامعتبر است.";
pub const MSG_PAST_DATE: &str = "تاریخ پیشنهادی نمی‌تواند در گذشته باشد.";
pub const MSG_BAD_DATE: &str = "یک تاریخ معتبر وارد کنید.";
pub const MSG_BAD_TIME: &str = "یک زمان معتبر وارد کنید.";
pub const MSG_BAD_CHOICE: &str = "یک گزینهٔ معتبر انتخاب کنید.";

pub const PHONE_MIN_LEN: usize = 10;
pub const PHONE_MAX_LEN: usize = 20;

/// Field name to messages, in field order.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Raw urlencoded submission. Every field is optional on the wire so a
/// missing field reports "required" rather than failing extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConsultationRequestForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "نام باید بین ۱ تا ۱۰۰ نویسه باشد."))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[serde(default)]
    #[validate(email(message = "یک نشانی ایمیل معتبر وارد کنید."))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_consultation_kind"))]
    pub consultation_type: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "موضوع باید بین ۱ تا ۲۰۰ نویسه باشد."))]
    pub subject: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "این فیلد لازم است."))]
    pub description: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub preferred_date: Option<String>,
    /// `HH:MM` or `HH:MM:SS`
    #[serde(default)]
    pub preferred_time: Option<String>,
}

fn message(code: &'static str, text: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(text));
    err
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.is_empty() {
        return Err(message("required", MSG_REQUIRED));
    }
    if !phone.starts_with('0') {
        return Err(message("phone_prefix", MSG_PHONE_PREFIX));
    }
    let len = phone.chars().count();
    if !(PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&len) {
        return Err(message("phone_length", MSG_PHONE_INVALID));
    }
    Ok(())
}

fn validate_consultation_kind(kind: &str) -> Result<(), ValidationError> {
    if kind.is_empty() {
        return Err(message("required", MSG_REQUIRED));
    }
    kind.parse::<ConsultationKind>()
        .map(|_| ())
        .map_err(|_| message("invalid_choice", MSG_BAD_CHOICE))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Flattens validator output into field name to messages.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl ConsultationRequestForm {
    /// Trims text fields and turns blank optional fields into `None`.
    pub fn cleaned(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: blank_to_none(self.email),
            consultation_type: self.consultation_type.trim().to_string(),
            subject: self.subject.trim().to_string(),
            description: self.description.trim().to_string(),
            preferred_date: blank_to_none(self.preferred_date),
            preferred_time: blank_to_none(self.preferred_time),
        }
    }

    /// Validates a cleaned form against `today` and builds the record to persist.
    pub fn validate_at(&self, today: NaiveDate) -> Result<NewConsultationRequest, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(e) => e,
        };

        let preferred_date = match self.preferred_date.as_deref() {
            None => None,
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) if date < today => {
                    errors.add("preferred_date", message("past_date", MSG_PAST_DATE));
                    None
                }
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("preferred_date", message("invalid_date", MSG_BAD_DATE));
                    None
                }
            },
        };

        let preferred_time = match self.preferred_time.as_deref() {
            None => None,
            Some(raw) => {
                let parsed = parse_time(raw);
                if parsed.is_none() {
                    errors.add("preferred_time", message("invalid_time", MSG_BAD_TIME));
                }
                parsed
            }
        };

        if !errors.is_empty() {
            return Err(field_errors(&errors));
        }
        let consultation_type = self
            .consultation_type
            .parse::<ConsultationKind>()
            .map_err(|_| FieldErrors::from([("consultation_type".to_string(), vec![MSG_BAD_CHOICE.to_string()])]))?;

        Ok(NewConsultationRequest {
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            consultation_type,
            subject: self.subject.clone(),
            description: self.description.clone(),
            preferred_date,
            preferred_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    fn valid_form() -> ConsultationRequestForm {
        ConsultationRequestForm {
            name: "علی رضایی".into(),
            phone: "09121234567".into(),
            email: None,
            consultation_type: "phone".into(),
            subject: "قرارداد اجاره".into(),
            description: "نیاز به بررسی قرارداد دارم".into(),
            preferred_date: Some("2024-03-20".into()),
            preferred_time: Some("10:30".into()),
        }
    }

    #[test]
    fn accepts_today_and_keeps_values() {
        let new = valid_form().validate_at(today()).unwrap();
        assert_eq!(new.consultation_type, ConsultationKind::Phone);
        assert_eq!(new.preferred_date, Some(today()));
        assert_eq!(new.preferred_time, NaiveTime::from_hms_opt(10, 30, 0));
        assert_eq!(new.email, None);
    }

    #[test]
    fn phone_must_start_with_zero() {
        let form = ConsultationRequestForm { phone: "123".into(), ..valid_form() };
        let errs = form.validate_at(today()).unwrap_err();
        assert_eq!(errs["phone"], vec![MSG_PHONE_PREFIX.to_string()]);
    }

    #[test]
    fn short_phone_is_invalid() {
        let form = ConsultationRequestForm { phone: "0912".into(), ..valid_form() };
        let errs = form.validate_at(today()).unwrap_err();
        assert_eq!(errs["phone"], vec![MSG_PHONE_INVALID.to_string()]);
    }

    #[test]
    fn past_date_is_rejected() {
        let form = ConsultationRequestForm { preferred_date: Some("2024-03-19".into()), ..valid_form() };
        let errs = form.validate_at(today()).unwrap_err();
        assert_eq!(errs["preferred_date"], vec![MSG_PAST_DATE.to_string()]);
    }

    #[test]
    fn blank_optional_fields_are_dropped() {
        let form = ConsultationRequestForm {
            email: Some("  ".into()),
            preferred_date: Some(String::new()),
            preferred_time: Some(" ".into()),
            ..valid_form()
        }
        .cleaned();
        let new = form.validate_at(today()).unwrap();
        assert!(new.email.is_none() && new.preferred_date.is_none() && new.preferred_time.is_none());
    }

    #[test]
    fn reports_every_broken_field() {
        let form = ConsultationRequestForm {
            name: String::new(),
            consultation_type: "video".into(),
            email: Some("not-an-email".into()),
            preferred_time: Some("25:00".into()),
            ..valid_form()
        };
        let errs = form.validate_at(today()).unwrap_err();
        for field in ["name", "consultation_type", "email", "preferred_time"] {
            assert!(errs.contains_key(field), "missing error for {field}");
        }
        assert_eq!(errs["consultation_type"], vec![MSG_BAD_CHOICE.to_string()]);
    }

    #[test]
    fn length_limits_count_characters() {
        let form = ConsultationRequestForm { name: "ن".repeat(100), ..valid_form() };
        assert!(form.validate_at(today()).is_ok());
        let form = ConsultationRequestForm { subject: "م".repeat(201), ..valid_form() };
        assert!(form.validate_at(today()).unwrap_err().contains_key("subject"));
    }
}
