#![cfg(feature = "inmem-store")]

mod common;

use actix_web::{test, App};
use dadpars::config;
use dadpars::models::{NewRecentQuestion, QuestionCategory};
use dadpars::repo::inmem::InMemRepo;
use dadpars::repo::QuestionRepo;
use serde_json::Value;

use common::*;

#[actix_web::test]
async fn blank_search_returns_empty_list() {
    let repo = InMemRepo::new();
    add_question(&repo, "مهریه چگونه اجرا می‌شود؟", QuestionCategory::Family, false).await;
    let app = test::init_service(App::new().app_data(state(repo)).configure(config)).await;

    for uri in ["/search", "/search?q=", "/search?q=%20%20"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!({ "questions": [] }), "{uri}");
    }
}

#[actix_web::test]
async fn search_caps_results_at_ten_newest() {
    let repo = InMemRepo::new();
    let mut ids = Vec::new();
    for i in 0..11 {
        ids.push(add_question(&repo, &format!("قرارداد اجاره شماره {i}"), QuestionCategory::RealEstate, false).await.id);
    }
    add_question(&repo, "سوال کیفری", QuestionCategory::Criminal, false).await;
    let app = test::init_service(App::new().app_data(state(repo)).configure(config)).await;

    let req = test::TestRequest::get().uri("/search?q=%D8%A7%D8%AC%D8%A7%D8%B1%D9%87").to_request(); // اجاره
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let hits = body["questions"].as_array().unwrap();
    assert_eq!(hits.len(), 10);
    // newest first; the oldest match falls off
    assert_eq!(hits[0]["id"], ids[10]);
    assert!(hits.iter().all(|h| h["id"] != ids[0]));
    assert_eq!(hits[0]["category"], QuestionCategory::RealEstate.label());
    assert_eq!(hits[0]["url"], format!("/question/{}/", ids[10]));
    assert_eq!(hits[0]["created_at"].as_str().unwrap().len(), "2024/01/01".len());
}

#[actix_web::test]
async fn search_is_case_insensitive_and_truncates_description() {
    let repo = InMemRepo::new();
    repo.create_question(NewRecentQuestion {
        question: "Cheque bounced".into(),
        description: "ب".repeat(150),
        category: QuestionCategory::Commercial,
        questioner_name: String::new(),
        is_answered: false,
        order: 0,
        is_active: true,
    })
    .await
    .unwrap();
    let app = test::init_service(App::new().app_data(state(repo)).configure(config)).await;

    let req = test::TestRequest::get().uri("/search?q=CHEQUE").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let description = body["questions"][0]["description"].as_str().unwrap();
    assert_eq!(description.chars().count(), 103);
    assert!(description.ends_with("..."));
}

#[actix_web::test]
async fn unanswered_sort_filters_but_stats_cover_everything() {
    let repo = InMemRepo::new();
    add_question(&repo, "پاسخ داده شده ۱", QuestionCategory::Labor, true).await;
    add_question(&repo, "پاسخ داده شده ۲", QuestionCategory::Family, true).await;
    let open = add_question(&repo, "بی‌پاسخ", QuestionCategory::Labor, false).await;
    let app = test::init_service(App::new().app_data(state(repo)).configure(config)).await;

    let req = test::TestRequest::get().uri("/questions/?sort=unanswered").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let items = body["questions"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], open.id);
    assert_eq!(body["total_questions"], 3);
    assert_eq!(body["answered_questions"], 2);
    assert_eq!(body["unanswered_questions"], 1);
    assert_eq!(body["current_sort"], "unanswered");
    assert_eq!(body["current_category"], "all");
}

#[actix_web::test]
async fn category_filter_and_answer_counts() {
    let repo = InMemRepo::new();
    let labor = add_question(&repo, "حق سنوات", QuestionCategory::Labor, true).await;
    add_question(&repo, "نفقه", QuestionCategory::Family, false).await;
    repo.create_answer(labor.id, "lawyer1", answer("پاسخ اول")).await.unwrap();
    repo.create_answer(labor.id, "lawyer2", answer("پاسخ دوم")).await.unwrap();
    let mut hidden = answer("پیش‌نویس");
    hidden.is_active = false;
    repo.create_answer(labor.id, "lawyer1", hidden).await.unwrap();
    let app = test::init_service(App::new().app_data(state(repo)).configure(config)).await;

    let req = test::TestRequest::get().uri("/questions/?category=labor").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let items = body["questions"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["answers_count"], 2);
    assert_eq!(items[0]["category_display"], QuestionCategory::Labor.label());
    assert_eq!(body["category_choices"].as_array().unwrap().len(), QuestionCategory::ALL.len());

    let req = test::TestRequest::get().uri("/questions/?category=astrology").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["questions"]["items"].as_array().unwrap().is_empty());
    assert_eq!(body["total_questions"], 2);
}

#[actix_web::test]
async fn questions_are_paged_by_twelve() {
    let repo = InMemRepo::new();
    for i in 0..13 {
        add_question(&repo, &format!("سوال {i}"), QuestionCategory::Civil, false).await;
    }
    let app = test::init_service(App::new().app_data(state(repo)).configure(config)).await;

    let req = test::TestRequest::get().uri("/questions/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["questions"]["items"].as_array().unwrap().len(), 12);
    assert_eq!(body["questions"]["num_pages"], 2);
    assert_eq!(body["questions"]["has_next"], true);

    let req = test::TestRequest::get().uri("/questions/?page=2").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["questions"]["items"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get().uri("/questions/?page=3").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn enormous_page_numbers_are_not_found() {
    let repo = InMemRepo::new();
    add_question(&repo, "سوال", QuestionCategory::Labor, false).await;
    let app = test::init_service(App::new().app_data(state(repo)).configure(config)).await;

    for page in ["18446744073709551615", "1000000000000000000", "18446744073709551616"] {
        let req = test::TestRequest::get().uri(&format!("/questions/?page={page}")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404, "{page}");
    }
}

#[actix_web::test]
async fn inactive_question_detail_is_not_found() {
    let repo = InMemRepo::new();
    let visible = add_question(&repo, "ارث", QuestionCategory::Civil, true).await;
    let hidden = repo
        .create_question(NewRecentQuestion {
            question: "پنهان".into(),
            description: String::new(),
            category: QuestionCategory::Other,
            questioner_name: String::new(),
            is_answered: false,
            order: 0,
            is_active: false,
        })
        .await
        .unwrap();
    let mut first = answer("اول");
    first.order = 1;
    let mut second = answer("دوم");
    second.order = 2;
    repo.create_answer(visible.id, "lawyer1", second).await.unwrap();
    repo.create_answer(visible.id, "lawyer1", first).await.unwrap();
    let app = test::init_service(App::new().app_data(state(repo)).configure(config)).await;

    let req = test::TestRequest::get().uri(&format!("/question/{}/", visible.id)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["question"]["id"], visible.id);
    let answers = body["answers"].as_array().unwrap();
    assert_eq!(answers[0]["answer"], "اول");
    assert_eq!(answers[1]["answer"], "دوم");

    for id in [hidden.id, 9999] {
        let req = test::TestRequest::get().uri(&format!("/question/{id}/")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    // hidden rows stay out of lists and search too
    let req = test::TestRequest::get().uri("/questions/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total_questions"], 1);
}
