//! Typed endpoint calls and the offline sample-data fallback.

mod common;

use common::{TestContext, ME_PATH};
use defectscope_lib::api::ApiError;
use defectscope_lib::types::{
    Category4m, ChatMessage, ChatRole, DefectInputData, InputSeverity, MachineHealth,
    ReportSeverity,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn sample_input() -> DefectInputData {
    DefectInputData {
        occurrence_date: "2025-02-03".to_string(),
        part_name: "Shaft".to_string(),
        part_number: "SH-100".to_string(),
        process_name: "Turning".to_string(),
        machine_name: "CMX800".to_string(),
        discoverer_name: "Sato".to_string(),
        phenomenon: "Diameter out of tolerance".to_string(),
        defect_type: "dimensional".to_string(),
        severity: InputSeverity::Major,
        category_4m: Category4m::Machine,
        factor: "tool wear".to_string(),
        root_cause: "insert not replaced".to_string(),
        countermeasure: "replace insert every 500 parts".to_string(),
        notes: String::new(),
        defect_image: None,
        good_image: None,
        workflow_image: None,
        machine_id: None,
        defect_description: None,
        operator_name: None,
        customer_name: None,
    }
}

#[tokio::test]
async fn recent_defects_requests_sorted_page() {
    let ctx = TestContext::new().await;
    ctx.seed("a1", Some("r1"));
    Mock::given(method("GET"))
        .and(path("/api/defect-reports"))
        .and(query_param("limit", "5"))
        .and(query_param("sort", "-created_at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": "1",
                "report_id": "DR-0001",
                "status": "open",
                "defect_description": "burr on edge",
                "severity": "high",
                "created_at": "2025-02-03T10:00:00Z"
            }]
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let defects = ctx.api.recent_defects(5).await.unwrap();

    assert_eq!(defects.len(), 1);
    assert_eq!(defects[0].severity, ReportSeverity::High);
}

#[tokio::test]
async fn recent_defects_without_results_is_empty() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/api/defect-reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&ctx.server)
        .await;

    assert!(ctx.api.recent_defects(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_defect_report_posts_form_data() {
    let ctx = TestContext::new().await;
    ctx.seed("a1", Some("r1"));
    Mock::given(method("POST"))
        .and(path("/api/defect-reports"))
        .and(body_partial_json(json!({
            "part_number": "SH-100",
            "severity": "major",
            "category_4m": "Machine"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "9",
            "report_id": "DR-0009",
            "status": "submitted",
            "defect_description": "Diameter out of tolerance",
            "severity": "medium",
            "created_at": "2025-02-03T10:00:00Z"
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let report = ctx.api.create_defect_report(&sample_input()).await.unwrap();

    assert_eq!(report.report_id, "DR-0009");
}

#[tokio::test]
async fn chat_sends_question_with_history() {
    let ctx = TestContext::new().await;
    ctx.seed("a1", Some("r1"));
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({
            "question": "Why is CMX800 failing?",
            "conversation_history": [
                { "role": "user", "content": "hello" },
                { "role": "assistant", "content": "hi" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Tool wear is the top cause.",
            "sources": ["report DR-0001"]
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let history = vec![
        ChatMessage {
            id: "1".to_string(),
            role: ChatRole::User,
            content: "hello".to_string(),
            timestamp: chrono::Utc::now(),
            sources: vec![],
        },
        ChatMessage {
            id: "2".to_string(),
            role: ChatRole::Assistant,
            content: "hi".to_string(),
            timestamp: chrono::Utc::now(),
            sources: vec![],
        },
    ];
    let reply = ctx
        .api
        .send_chat_message("Why is CMX800 failing?", &history)
        .await
        .unwrap();

    assert_eq!(reply.response, "Tool wear is the top cause.");
    assert_eq!(reply.sources, vec!["report DR-0001".to_string()]);
}

#[tokio::test]
async fn trends_pass_day_window() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/api/manufacturing/defects/trends"))
        .and(query_param("days", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "date": "2/1", "defects": 4, "target": 10 }
        ])))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let trends = ctx.api.defect_trends(3).await.unwrap();
    assert_eq!(trends.len(), 1);
}

#[tokio::test]
async fn fallback_serves_sample_data_on_server_error() {
    let ctx = TestContext::with_fallback(true).await;
    for route in [
        "/api/manufacturing/kpis",
        "/api/manufacturing/executive-summary",
        "/api/manufacturing/defects/trends",
        "/api/manufacturing/machines",
        "/api/machines",
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(404))
            .mount(&ctx.server)
            .await;
    }

    let kpis = ctx.api.manufacturing_kpis().await.unwrap();
    assert_eq!(kpis.total_defects, 156);

    let summary = ctx.api.executive_summary().await.unwrap();
    assert_eq!(summary.top_root_causes.len(), 5);

    let trends = ctx.api.defect_trends(7).await.unwrap();
    assert_eq!(trends.len(), 7);

    let status = ctx.api.machine_status().await.unwrap();
    assert_eq!(status[2].status, MachineHealth::Critical);

    let machines = ctx.api.machines().await.unwrap();
    assert_eq!(machines[0].id, "CMX800");
}

#[tokio::test]
async fn fallback_disabled_propagates_errors() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/api/manufacturing/kpis"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    let err = ctx.api.manufacturing_kpis().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn fallback_never_masks_dead_session() {
    let ctx = TestContext::with_fallback(true).await;
    ctx.seed("stale", None);
    Mock::given(method("GET"))
        .and(path("/api/manufacturing/kpis"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let err = ctx.api.manufacturing_kpis().await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(ctx.stored_access().is_none());
}

#[tokio::test]
async fn unreadable_body_is_a_json_error() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path(ME_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&ctx.server)
        .await;

    let err = ctx.api.current_user().await.unwrap_err();
    assert!(matches!(err, ApiError::Json(_)));
}
