use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::web::{self, Data};
use actix_web::{App, test};
use serde_json::{Value, json};

use crate::auth::jwt::testing::{access_token, token};
use crate::config::Config;
use crate::error::{json_error_handler, query_error_handler};
use crate::models::TokenType;
use crate::routes;
use crate::services::attendance::{AttendancePolicy, AttendanceService};
use crate::services::leave::{LeavePolicy, LeaveService};
use crate::store::memory::MemoryStore;
use crate::utils::clock::{Clock, ManualClock};

const SECRET: &str = "test-secret";
const ADMIN: u8 = 1;
const HR: u8 = 2;
const EMPLOYEE: u8 = 3;

async fn fixtures() -> (Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(
        MemoryStore::default()
            .with_employee(1, None, true)
            .await
            .with_employee(2, None, true)
            .await,
    );
    (store, Arc::new(ManualClock::at("2025-06-02T09:00:00+00:00")))
}

macro_rules! test_app {
    ($store:expr, $clock:expr) => {{
        let config = Config::for_tests(SECRET);
        let store = $store.clone();
        let clock: Data<dyn Clock> = Data::from($clock.clone() as Arc<dyn Clock>);
        test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .app_data(Data::new(AttendanceService::new(
                    store.clone(),
                    store.clone(),
                    AttendancePolicy::default(),
                )))
                .app_data(Data::new(LeaveService::new(
                    store.clone(),
                    store.clone(),
                    LeavePolicy::default(),
                )))
                .app_data(clock)
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .app_data(web::QueryConfig::default().error_handler(query_error_handler))
                .configure(|cfg| routes::configure(cfg, config.clone())),
        )
        .await
    }};
}

fn employee(id: u64) -> String {
    access_token(EMPLOYEE, Some(id), SECRET)
}

fn hr() -> String {
    access_token(HR, None, SECRET)
}

fn request(method: test::TestRequest, uri: &str, bearer: &str) -> test::TestRequest {
    method
        .uri(uri)
        .peer_addr("127.0.0.1:40000".parse().unwrap())
        .insert_header(("Authorization", format!("Bearer {bearer}")))
}

fn leave_body(start: &str, end: &str) -> Value {
    json!({
        "start_date": start,
        "end_date": end,
        "leave_type": "annual",
        "reason": "Family trip"
    })
}

#[actix_web::test]
async fn health_needs_no_token() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn missing_or_refresh_token_is_unauthorized() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = test::TestRequest::get()
        .uri("/api/attendance/today")
        .peer_addr("127.0.0.1:40000".parse().unwrap())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let refresh = token(TokenType::Refresh, EMPLOYEE, Some(1), SECRET);
    let req = request(test::TestRequest::get(), "/api/attendance/today", &refresh).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn clock_in_twice_reports_existing_clock_in() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::post(), "/api/attendance/clock-in", &employee(1)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "partial");
    assert_eq!(body["data"]["clock_in_at"], "2025-06-02T09:00:00Z");

    clock.set("2025-06-02T09:05:00+00:00");
    let req = request(test::TestRequest::post(), "/api/attendance/clock-in", &employee(1)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "already_clocked_in");
    assert_eq!(body["error"]["clock_in_at"], "2025-06-02T09:00:00Z");
    assert_eq!(body["error"]["can_clock_out"], true);
}

#[actix_web::test]
async fn short_session_is_refused_then_full_day_completes() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::post(), "/api/attendance/clock-in", &employee(1)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    clock.set("2025-06-02T09:05:00+00:00");
    let req = request(test::TestRequest::post(), "/api/attendance/clock-out", &employee(1)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "session_too_short");
    assert_eq!(body["error"]["elapsed_minutes"], 5);

    clock.set("2025-06-02T17:30:00+00:00");
    let req = request(test::TestRequest::post(), "/api/attendance/clock-out", &employee(1)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "present");
    assert_eq!(body["data"]["total_worked_hours"], 8.5);
    assert_eq!(body["data"]["overtime_hours"], 0.5);

    let req = request(test::TestRequest::get(), "/api/attendance/today", &employee(1)).to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["phase"], "clocked_out");
    assert_eq!(body["can_clock_in"], false);
}

#[actix_web::test]
async fn clock_in_outside_window_is_refused() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    for at in ["2025-06-02T05:30:00+00:00", "2025-06-02T23:30:00+00:00"] {
        clock.set(at);
        let req = request(test::TestRequest::post(), "/api/attendance/clock-in", &employee(1)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "out_of_window");
    }
}

#[actix_web::test]
async fn user_without_employee_profile_cannot_clock_in() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::post(), "/api/attendance/clock-in", &hr()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let unknown = employee(77);
    let req = request(test::TestRequest::post(), "/api/attendance/clock-in", &unknown).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn report_and_foreign_history_are_reviewer_only() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::get(), "/api/attendance/report?range=week", &employee(1)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = request(
        test::TestRequest::get(),
        "/api/attendance/history?employee_id=2",
        &employee(1),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = request(test::TestRequest::get(), "/api/attendance/report?range=week", &hr()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!([]));
}

#[actix_web::test]
async fn custom_range_without_bounds_is_a_validation_error() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::get(), "/api/attendance/summary?range=custom", &employee(1)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "validation_failed");
    assert_eq!(body["error"]["fields"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn out_of_bounds_anchor_dates_are_validation_errors() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    for uri in [
        "/api/attendance/history?range=week&date=1900-01-07",
        "/api/attendance/summary?range=today&date=1900-01-07",
        "/api/leave/summary?range=week&date=1900-01-07",
    ] {
        let req = request(test::TestRequest::get(), uri, &employee(1)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["fields"][0]["field"], "date");
    }

    let req = request(
        test::TestRequest::get(),
        "/api/attendance/report?range=week&date=1900-01-07",
        &hr(),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn overlapping_leave_is_refused_with_conflicts() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::post(), "/api/leave", &employee(1))
        .set_json(leave_body("2025-06-10", "2025-06-12"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: Value = test::read_body_json(resp).await;
    assert_eq!(first["status"], "pending");
    assert_eq!(first["total_days"], 3);

    let req = request(
        test::TestRequest::get(),
        "/api/leave/availability?start_date=2025-06-11&end_date=2025-06-13",
        &employee(1),
    )
    .to_request();
    let availability: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(availability["available"], false);
    assert_eq!(availability["conflicts"][0]["id"], first["id"]);

    let req = request(test::TestRequest::post(), "/api/leave", &employee(1))
        .set_json(leave_body("2025-06-11", "2025-06-13"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "overlap_conflict");
    assert_eq!(body["error"]["conflicts"], availability["conflicts"]);

    // another employee's calendar is independent
    let req = request(test::TestRequest::post(), "/api/leave", &employee(2))
        .set_json(leave_body("2025-06-11", "2025-06-13"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn invalid_leave_payloads_are_validation_errors() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::post(), "/api/leave", &employee(1))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["fields"].as_array().unwrap().len(), 4);

    let req = request(test::TestRequest::post(), "/api/leave", &employee(1))
        .set_json(json!({ "start_date": "June 10th" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "validation_failed");

    let req = request(test::TestRequest::post(), "/api/leave", &employee(1))
        .set_json(leave_body("2025-06-01", "2025-06-03"))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["error"]["code"], "start_in_past");
}

#[actix_web::test]
async fn cancel_tomorrow_then_it_is_gone() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::post(), "/api/leave", &employee(1))
        .set_json(leave_body("2025-06-03", "2025-06-03"))
        .to_request();
    let created: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let uri = format!("/api/leave/{}", created["id"]);

    let req = request(test::TestRequest::delete(), &uri, &employee(2)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = request(test::TestRequest::delete(), &uri, &employee(1)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = request(test::TestRequest::get(), &uri, &employee(1)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "leave_request_not_found");
}

#[actix_web::test]
async fn cancel_after_start_is_refused() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::post(), "/api/leave", &employee(1))
        .set_json(leave_body("2025-06-03", "2025-06-04"))
        .to_request();
    let created: Value = test::read_body_json(test::call_service(&app, req).await).await;

    clock.set("2025-06-04T09:00:00+00:00");
    let req = request(
        test::TestRequest::delete(),
        &format!("/api/leave/{}", created["id"]),
        &employee(1),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "not_cancellable");
}

#[actix_web::test]
async fn review_flow_is_guarded_and_one_shot() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    let req = request(test::TestRequest::post(), "/api/leave", &employee(1))
        .set_json(leave_body("2025-06-10", "2025-06-12"))
        .to_request();
    let created: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let approve = format!("/api/leave/{}/approve", created["id"]);
    let reject = format!("/api/leave/{}/reject", created["id"]);

    let req = request(test::TestRequest::put(), &approve, &employee(1)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = request(test::TestRequest::put(), &approve, &hr()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["reviewed_at"], "2025-06-02T09:00:00Z");

    let admin = access_token(ADMIN, None, SECRET);
    let req = request(test::TestRequest::put(), &reject, &admin).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "already_reviewed");
    assert_eq!(body["error"]["status"], "approved");

    let req = request(test::TestRequest::put(), "/api/leave/999/approve", &hr()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn leave_listings_by_audience() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    for (id, start, end) in [(1, "2025-06-10", "2025-06-11"), (1, "2025-06-20", "2025-06-20"), (2, "2025-06-10", "2025-06-10")] {
        let req = request(test::TestRequest::post(), "/api/leave", &employee(id))
            .set_json(leave_body(start, end))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = request(test::TestRequest::get(), "/api/leave/mine", &employee(1)).to_request();
    let mine: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(mine.as_array().unwrap().len(), 2);

    let req = request(test::TestRequest::get(), "/api/leave?employee_id=1&per_page=1", &employee(1)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = request(test::TestRequest::get(), "/api/leave?employee_id=1&per_page=1", &hr()).to_request();
    let page: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["per_page"], 1);
    assert_eq!(page["data"].as_array().unwrap().len(), 1);

    let req = request(test::TestRequest::get(), "/api/leave/summary?range=month", &employee(1)).to_request();
    let summary: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(summary["total"]["requests"], 2);
    assert_eq!(summary["total"]["days"], 3);
    assert_eq!(summary["by_type"]["annual"]["days"], 3);
}

#[actix_web::test]
async fn huge_page_numbers_are_validation_errors() {
    let (store, clock) = fixtures().await;
    let app = test_app!(store, clock);

    for page in [u64::MAX, u64::from(u32::MAX) + 1] {
        let uri = format!("/api/leave?page={page}&per_page=100");
        let req = request(test::TestRequest::get(), &uri, &hr()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["fields"][0]["field"], "page");
    }

    let req = request(test::TestRequest::get(), "/api/leave?page=5", &hr()).to_request();
    let page: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(page["page"], 5);
    assert_eq!(page["data"].as_array().unwrap().len(), 0);
}
