use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Error returned when a stored or submitted key is not part of a closed enumeration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Generates the string key, Persian label and `FromStr` impls for a closed choice enum.
macro_rules! choice_enum {
    ($name:ident, $kind:literal, { $($variant:ident => ($key:literal, $label:literal)),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self { $($name::$variant => $key),+ }
            }

            pub fn label(&self) -> &'static str {
                match self { $($name::$variant => $label),+ }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationKind {
    Phone,
    Online,
    InPerson,
    RetiredJudge,
}

choice_enum!(ConsultationKind, "consultation type", {
    Phone => ("phone", "مشاوره تلفنی"),
    Online => ("online", "مشاوره آنلاین"),
    InPerson => ("in_person", "مشاوره حضوری"),
    RetiredJudge => ("retired_judge", "مشاوره با قاضی بازنشسته"),
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    Family,
    Criminal,
    Civil,
    Labor,
    RealEstate,
    Commercial,
    Other,
}

choice_enum!(QuestionCategory, "category", {
    Family => ("family", "خانواده"),
    Criminal => ("criminal", "کیفری"),
    Civil => ("civil", "مدنی"),
    Labor => ("labor", "کار و کارگر"),
    RealEstate => ("real_estate", "املاک و مستغلات"),
    Commercial => ("commercial", "تجاری"),
    Other => ("other", "سایر"),
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Completed,
}

choice_enum!(RequestStatus, "status", {
    Pending => ("pending", "در انتظار بررسی"),
    Approved => ("approved", "تایید شده"),
    Rejected => ("rejected", "رد شده"),
    Completed => ("completed", "انجام شده"),
});

impl RequestStatus {
    /// `pending -> approved | rejected`, `approved -> completed`.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        next.predecessors().contains(&self)
    }

    /// Statuses from which a request may move into `self`.
    pub fn predecessors(self) -> &'static [RequestStatus] {
        match self {
            RequestStatus::Pending => &[],
            RequestStatus::Approved | RequestStatus::Rejected => &[RequestStatus::Pending],
            RequestStatus::Completed => &[RequestStatus::Approved],
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SiteContentKind {
    HeroTitle,
    HeroSubtitle,
    AboutText,
    ContactInfo,
    Services,
    Testimonials,
}

choice_enum!(SiteContentKind, "content type", {
    HeroTitle => ("hero_title", "عنوان اصلی صفحه"),
    HeroSubtitle => ("hero_subtitle", "زیرعنوان اصلی صفحه"),
    AboutText => ("about_text", "متن درباره ما"),
    ContactInfo => ("contact_info", "اطلاعات تماس"),
    Services => ("services", "خدمات"),
    Testimonials => ("testimonials", "نظرات مشتریان"),
});

/// Cuts `text` to `max` characters, appending `...` when anything was dropped.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

// ---------------- Content catalog ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Service {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewService {
    pub title: String,
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Faq {
    pub id: Id,
    pub question: String,
    pub answer: String,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewFaq {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SiteContent {
    pub id: Id,
    pub content_type: SiteContentKind,
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload; `content_type` is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewSiteContent {
    pub content_type: SiteContentKind,
    pub content: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

// ---------------- Consultation catalog ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConsultationType {
    pub id: Id,
    pub type_key: ConsultationKind,
    pub title: String,
    pub description: String,
    pub icon: String,
    /// One feature per line.
    pub features: String,
    pub button_text: String,
    pub button_url: String,
    pub button_color: String,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ConsultationType {
    pub fn features_list(&self) -> Vec<String> {
        split_features(&self.features)
    }
}

/// Non-empty trimmed lines of a newline-delimited feature list, in order.
pub fn split_features(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewConsultationType {
    pub type_key: ConsultationKind,
    pub title: String,
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub features: String,
    pub button_text: String,
    #[serde(default)]
    pub button_url: String,
    #[serde(default = "default_button_color")]
    pub button_color: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A consultation type as handed to page renderers, with its features pre-split.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConsultationTypeView {
    #[serde(flatten)]
    pub consultation_type: ConsultationType,
    pub features_list: Vec<String>,
}

impl From<ConsultationType> for ConsultationTypeView {
    fn from(consultation_type: ConsultationType) -> Self {
        let features_list = consultation_type.features_list();
        Self { consultation_type, features_list }
    }
}

// ---------------- Q&A catalog ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecentQuestion {
    pub id: Id,
    pub question: String,
    pub description: String,
    pub category: QuestionCategory,
    pub questioner_name: String,
    pub is_answered: bool,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl RecentQuestion {
    pub fn detail_path(&self) -> String {
        question_path(self.id)
    }

    pub fn summary(&self) -> String {
        truncate_chars(&self.question, 50)
    }
}

pub fn question_path(id: Id) -> String {
    format!("/question/{id}/")
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewRecentQuestion {
    pub question: String,
    #[serde(default)]
    pub description: String,
    pub category: QuestionCategory,
    #[serde(default)]
    pub questioner_name: String,
    #[serde(default)]
    pub is_answered: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct LawyerAnswer {
    pub id: Id,
    pub question_id: Id,
    /// Staff identity (JWT subject) of the authoring lawyer.
    pub lawyer: String,
    pub answer: String,
    pub short_answer: String,
    pub lawyer_title: String,
    pub icon: String,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewLawyerAnswer {
    pub answer: String,
    pub short_answer: String,
    #[serde(default = "default_lawyer_title")]
    pub lawyer_title: String,
    #[serde(default = "default_answer_icon")]
    pub icon: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

// ---------------- Request intake ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConsultationRequest {
    pub id: Id,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub consultation_type: ConsultationKind,
    pub subject: String,
    pub description: String,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<NaiveTime>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated submission; only the intake form builds these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewConsultationRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub consultation_type: ConsultationKind,
    pub subject: String,
    pub description: String,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct ConsultationResponse {
    pub id: Id,
    pub request_id: Id,
    /// Staff identity (JWT subject) of the responder.
    pub responder: String,
    pub response_text: String,
    pub response_date: DateTime<Utc>,
    pub is_final: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewConsultationResponse {
    pub response_text: String,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateRequestStatus {
    pub status: RequestStatus,
}

fn default_true() -> bool { true }
fn default_button_color() -> String { "primary".into() }
fn default_lawyer_title() -> String { "وکیل پایه یک".into() }
fn default_answer_icon() -> String { "fas fa-gavel".into() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_list_skips_blank_lines_and_trims() {
        assert_eq!(split_features("a\n\nb \n c"), vec!["a", "b", "c"]);
        assert!(split_features("").is_empty());
        assert_eq!(split_features("first\r\nsecond\r\n"), vec!["first", "second"]);
    }

    #[test]
    fn status_transitions() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Rejected.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(Rejected.is_terminal() && Completed.is_terminal());
        assert!(!Approved.is_terminal());
    }

    #[test]
    fn choice_keys_round_trip_through_from_str() {
        for kind in ConsultationKind::ALL {
            assert_eq!(kind.as_str().parse::<ConsultationKind>().unwrap(), *kind);
        }
        assert_eq!("real_estate".parse::<QuestionCategory>().unwrap().label(), "املاک و مستغلات");
        let err = "fax".parse::<ConsultationKind>().unwrap_err();
        assert_eq!(err.value, "fax");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let persian = "س".repeat(101);
        let cut = truncate_chars(&persian, 100);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
