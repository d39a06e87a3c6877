//! Filtering, ordering and projection rules for the public question pages.

use std::cmp::Ordering;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{truncate_chars, Id, QuestionCategory, RecentQuestion};

pub const QUESTIONS_PER_PAGE: usize = 12;
pub const SEARCH_LIMIT: usize = 10;
const SEARCH_DESCRIPTION_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(QuestionCategory),
    /// A category key outside the enumeration; matches nothing.
    Unknown,
}

impl CategoryFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some("all") => CategoryFilter::All,
            Some(key) => key.parse().map(CategoryFilter::Only).unwrap_or(CategoryFilter::Unknown),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOrder {
    /// Admin display order: (order, -created_at).
    Display,
    Newest,
    Oldest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionFilter {
    pub category: CategoryFilter,
    pub answered: Option<bool>,
    pub order: QuestionOrder,
}

impl Default for QuestionFilter {
    fn default() -> Self {
        Self { category: CategoryFilter::All, answered: None, order: QuestionOrder::Newest }
    }
}

impl QuestionFilter {
    /// `sort` accepts newest (default), oldest, answered and unanswered. Any other
    /// value keeps the admin display order without an answered filter.
    pub fn from_query(category: Option<&str>, sort: Option<&str>) -> Self {
        let category = CategoryFilter::parse(category);
        let (answered, order) = match sort.unwrap_or("newest") {
            "newest" => (None, QuestionOrder::Newest),
            "oldest" => (None, QuestionOrder::Oldest),
            "answered" => (Some(true), QuestionOrder::Newest),
            "unanswered" => (Some(false), QuestionOrder::Newest),
            _ => (None, QuestionOrder::Display),
        };
        Self { category, answered, order }
    }

    /// Active flag included.
    pub fn matches(&self, q: &RecentQuestion) -> bool {
        if !q.is_active {
            return false;
        }
        let category_ok = match self.category {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => q.category == c,
            CategoryFilter::Unknown => false,
        };
        category_ok && self.answered.map_or(true, |a| q.is_answered == a)
    }

    pub fn compare(&self, a: &RecentQuestion, b: &RecentQuestion) -> Ordering {
        match self.order {
            QuestionOrder::Display => display_order(a, b),
            QuestionOrder::Newest => newest_first(a, b),
            QuestionOrder::Oldest => newest_first(b, a),
        }
    }
}

/// `(order, -created_at)`, newer id first on ties.
pub fn display_order(a: &RecentQuestion, b: &RecentQuestion) -> Ordering {
    a.order.cmp(&b.order).then_with(|| newest_first(a, b))
}

pub fn newest_first(a: &RecentQuestion, b: &RecentQuestion) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

/// Case-insensitive substring match on question text or description.
pub fn matches_search(q: &RecentQuestion, needle_lower: &str) -> bool {
    q.question.to_lowercase().contains(needle_lower)
        || q.description.to_lowercase().contains(needle_lower)
}

/// Counts over the whole active question set, independent of any list filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct QuestionStats {
    pub total_questions: usize,
    pub answered_questions: usize,
    pub unanswered_questions: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionListItem {
    #[serde(flatten)]
    pub question: RecentQuestion,
    pub category_display: String,
    pub answers_count: i64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SearchHit {
    pub id: Id,
    pub question: String,
    pub description: String,
    pub category: String,
    pub url: String,
    pub created_at: String,
}

impl From<&RecentQuestion> for SearchHit {
    fn from(q: &RecentQuestion) -> Self {
        Self {
            id: q.id,
            question: q.question.clone(),
            description: truncate_chars(&q.description, SEARCH_DESCRIPTION_CHARS),
            category: q.category.label().to_string(),
            url: q.detail_path(),
            created_at: q.created_at.format("%Y/%m/%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResponse {
    pub questions: Vec<SearchHit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn question(id: Id, order: i32, answered: bool, category: QuestionCategory) -> RecentQuestion {
        RecentQuestion {
            id,
            question: format!("question {id}"),
            description: String::new(),
            category,
            questioner_name: String::new(),
            is_answered: answered,
            order,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, id as u32, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn parses_sort_and_category() {
        let f = QuestionFilter::from_query(Some("family"), Some("unanswered"));
        assert_eq!(f.category, CategoryFilter::Only(QuestionCategory::Family));
        assert_eq!(f.answered, Some(false));
        assert_eq!(f.order, QuestionOrder::Newest);

        let f = QuestionFilter::from_query(Some("all"), Some("bogus"));
        assert_eq!(f.category, CategoryFilter::All);
        assert_eq!(f.answered, None);
        assert_eq!(f.order, QuestionOrder::Display);

        assert_eq!(QuestionFilter::from_query(None, None), QuestionFilter::default());
        assert_eq!(CategoryFilter::parse(Some("tax")), CategoryFilter::Unknown);
    }

    #[test]
    fn filter_and_ordering() {
        let mut qs = vec![
            question(1, 2, true, QuestionCategory::Labor),
            question(2, 1, false, QuestionCategory::Family),
            question(3, 1, false, QuestionCategory::Labor),
        ];
        let mut inactive = question(4, 0, false, QuestionCategory::Labor);
        inactive.is_active = false;
        qs.push(inactive);

        let f = QuestionFilter::from_query(Some("labor"), Some("oldest"));
        let mut hits: Vec<_> = qs.iter().filter(|q| f.matches(q)).collect();
        hits.sort_by(|a, b| f.compare(a, b));
        assert_eq!(hits.iter().map(|q| q.id).collect::<Vec<_>>(), vec![1, 3]);

        let f = QuestionFilter::from_query(None, Some("whatever"));
        let mut hits: Vec<_> = qs.iter().filter(|q| f.matches(q)).collect();
        hits.sort_by(|a, b| f.compare(a, b));
        assert_eq!(hits.iter().map(|q| q.id).collect::<Vec<_>>(), vec![3, 2, 1]);

        let unknown = QuestionFilter::from_query(Some("tax"), None);
        assert!(qs.iter().all(|q| !unknown.matches(q)));
    }

    #[test]
    fn search_hit_projection() {
        let mut q = question(7, 0, false, QuestionCategory::Civil);
        q.description = "x".repeat(120);
        let hit = SearchHit::from(&q);
        assert_eq!(hit.url, "/question/7/");
        assert_eq!(hit.created_at, "2024/01/07");
        assert_eq!(hit.category, "مدنی");
        assert_eq!(hit.description.chars().count(), 103);
        assert!(matches_search(&q, "question 7"));
        assert!(matches_search(&q, "xxx"));
        assert!(!matches_search(&q, "missing"));
    }
}
