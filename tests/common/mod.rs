#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use chrono::Utc;
use dadpars::auth::{create_jwt, Role};
use dadpars::models::{NewLawyerAnswer, NewRecentQuestion, QuestionCategory, RecentQuestion};
use dadpars::rate_limit::RateLimiterFacade;
use dadpars::repo::inmem::InMemRepo;
use dadpars::repo::QuestionRepo;
use dadpars::AppState;

pub const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

pub fn state(repo: InMemRepo) -> web::Data<AppState> {
    state_with_limiter(repo, None)
}

pub fn state_with_limiter(repo: InMemRepo, rate_limiter: Option<RateLimiterFacade>) -> web::Data<AppState> {
    web::Data::new(AppState { repo: Arc::new(repo), jwt_secret: SECRET.to_string(), rate_limiter })
}

pub fn staff_token() -> String {
    create_jwt(SECRET, "lawyer1", vec![Role::Staff]).unwrap()
}

pub fn admin_token() -> String {
    create_jwt(SECRET, "admin", vec![Role::Staff, Role::Admin]).unwrap()
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// A complete, valid intake submission.
pub fn intake_form() -> Vec<(&'static str, String)> {
    vec![
        ("name", "مریم احمدی".to_string()),
        ("phone", "09121234567".to_string()),
        ("email", String::new()),
        ("consultation_type", "phone".to_string()),
        ("subject", "مهریه".to_string()),
        ("description", "سوال درباره اجرای مهریه".to_string()),
        ("preferred_date", today()),
        ("preferred_time", "10:00".to_string()),
    ]
}

pub fn with_field(mut form: Vec<(&'static str, String)>, key: &str, value: &str) -> Vec<(&'static str, String)> {
    for (k, v) in form.iter_mut() {
        if *k == key {
            *v = value.to_string();
        }
    }
    form
}

pub async fn add_question(repo: &InMemRepo, text: &str, category: QuestionCategory, answered: bool) -> RecentQuestion {
    repo.create_question(NewRecentQuestion {
        question: text.to_string(),
        description: String::new(),
        category,
        questioner_name: "کاربر مهمان".into(),
        is_answered: answered,
        order: 0,
        is_active: true,
    })
    .await
    .unwrap()
}

pub fn answer(text: &str) -> NewLawyerAnswer {
    NewLawyerAnswer {
        answer: text.to_string(),
        short_answer: text.to_string(),
        lawyer_title: "وکیل پایه یک".into(),
        icon: "fas fa-gavel".into(),
        order: 0,
        is_active: true,
    }
}
