use super::server::{Canned, serve};
use crate::{AnalysisResults, ClientError, DesignLevel, NO_EXPLANATION, Platform, WorkItemQuery};
use serde_json::json;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

#[tokio::test]
async fn render_png_posts_code_and_returns_bytes() {
    let (client, server) = serve(vec![Canned::bytes("image/png", PNG_MAGIC)]).await;
    let png = client.render_png("graph TD\nA-->B").await.unwrap();
    assert_eq!(png, PNG_MAGIC);

    let seen = server.await.unwrap();
    assert_eq!(seen[0].target, "POST /api/render_mermaid");
    assert!(seen[0].head.to_ascii_lowercase().contains("content-type: application/json"));
    assert_eq!(seen[0].json(), json!({"code": "graph TD\nA-->B"}));
}

#[tokio::test]
async fn drawio_conversion_reports_unsuccessful_payloads() {
    let (client, server) = serve(vec![
        Canned::json(200, json!({"success": true, "xml": "<mxfile/>"})),
        Canned::json(200, json!({"success": false})),
    ])
    .await;
    assert_eq!(client.convert_to_drawio("graph TD").await.unwrap(), "<mxfile/>");

    let err = client.convert_to_drawio("graph TD").await.unwrap_err();
    assert!(matches!(err, ClientError::ConversionFailed { target: "draw.io" }));
    assert_eq!(err.to_string(), "Failed to convert to draw.io");

    let seen = server.await.unwrap();
    assert_eq!(seen[1].target, "POST /api/convert_mermaid_to_drawio");
}

#[tokio::test]
async fn docx_conversion_sends_markdown() {
    let (client, server) = serve(vec![Canned::bytes(
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        b"PK\x03\x04",
    )])
    .await;
    let doc = client.convert_to_docx("# TRD\n\nBody").await.unwrap();
    assert_eq!(doc, b"PK\x03\x04");
    let seen = server.await.unwrap();
    assert_eq!(seen[0].json(), json!({"markdown": "# TRD\n\nBody"}));
}

#[tokio::test]
async fn error_bodies_surface_the_server_message() {
    let (client, _server) = serve(vec![
        Canned::json(500, json!({"error": "Approval service down"})),
        Canned::bytes("text/plain", b"gateway timeout"),
    ])
    .await;
    let results = AnalysisResults {
        analysis_id: Some("a-1".to_string()),
        trd: None,
        hld: None,
        lld: None,
        backlog: json!([]),
        approval_id: None,
        approval_url: None,
        extra: Default::default(),
    };
    let err = client.approve(&results).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.server_message().as_deref(), Some("Approval service down"));

    // 200 with a non-JSON body is a decode failure, not a status failure.
    let err = client.documents().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn approve_wraps_results_with_their_id() {
    let (client, server) = serve(vec![Canned::json(
        200,
        json!({"approval_id": "ap-9", "approval_url": "https://example.test/ap-9"}),
    )])
    .await;
    let results: AnalysisResults = serde_json::from_value(json!({
        "analysis_id": "a-7",
        "hld": "```mermaid\ngraph TD\nA-->B\n```",
        "backlog": [{"title": "Login"}],
        "cost_estimate": {"total": 3}
    }))
    .unwrap();
    assert_eq!(
        results.diagram(DesignLevel::High).as_deref(),
        Some("graph TD\nA-->B\n")
    );

    let ticket = client.approve(&results).await.unwrap();
    assert_eq!(ticket.approval_id, "ap-9");

    let seen = server.await.unwrap();
    let body = seen[0].json();
    assert_eq!(body["analysis_id"], "a-7");
    assert_eq!(body["results"]["cost_estimate"]["total"], 3);
    assert_eq!(body["results"]["backlog"][0]["title"], "Login");
}

#[tokio::test]
async fn approval_status_escapes_the_id() {
    let (client, server) = serve(vec![Canned::json(200, json!({"status": "approve"}))]).await;
    let status = client.approval_status("ap 1").await.unwrap();
    assert!(status.is_approved());
    let seen = server.await.unwrap();
    assert_eq!(seen[0].target, "GET /api/approval_status/ap%201");
}

#[tokio::test]
async fn work_items_translate_query_names_per_platform() {
    let (client, server) = serve(vec![
        Canned::json(200, json!({"issues": [{"key": "BA-1", "title": "Export"}], "count": 1})),
        Canned::json(200, json!({"work_items": [], "count": 0})),
    ])
    .await;
    let query = WorkItemQuery {
        project: Some("BA".to_string()),
        item_type: None,
        limit: Some(5),
    };
    let jira = client.work_items(Platform::Jira, &query).await.unwrap();
    assert_eq!(jira.count, 1);
    assert_eq!(jira.summaries()[0].id.as_deref(), Some("BA-1"));
    let ado = client.work_items(Platform::Ado, &query).await.unwrap();
    assert!(ado.items.is_empty());

    let seen = server.await.unwrap();
    assert_eq!(seen[0].target, "GET /api/jira/issues?project_key=BA&max_results=5");
    assert_eq!(seen[1].target, "GET /api/ado/work-items?project=BA&top=5");
}

#[tokio::test]
async fn work_item_detail_sends_project_only_to_ado() {
    let (client, server) = serve(vec![
        Canned::json(200, json!({"id": 42})),
        Canned::json(200, json!({"key": "BA-2"})),
    ])
    .await;
    client.work_item(Platform::Ado, "42", Some("BA")).await.unwrap();
    client.work_item(Platform::Jira, "BA-2", Some("BA")).await.unwrap();
    let seen = server.await.unwrap();
    assert_eq!(seen[0].target, "GET /api/ado/work-items/42?project=BA");
    assert_eq!(seen[1].target, "GET /api/jira/issues/BA-2");
}

#[tokio::test]
async fn explanation_defaults_when_missing() {
    let (client, server) = serve(vec![
        Canned::json(200, json!({"explanation": "Adds DOCX export."})),
        Canned::json(200, json!({})),
    ])
    .await;
    assert_eq!(
        client.explain_work_item(Platform::Jira, "BA-3").await.unwrap(),
        "Adds DOCX export."
    );
    assert_eq!(
        client.explain_work_item(Platform::Ado, "7").await.unwrap(),
        NO_EXPLANATION
    );
    let seen = server.await.unwrap();
    assert_eq!(seen[0].target, "POST /api/jira/issues/BA-3/explain");
    assert_eq!(seen[1].target, "POST /api/ado/work-items/7/explain");
}

#[tokio::test]
async fn uploads_send_a_multipart_file_field() {
    let (client, server) = serve(vec![Canned::json(
        200,
        json!({"id": 3, "name": "brd.pdf", "lob": "Retail", "tags": ["brd"]}),
    )])
    .await;
    let doc = client
        .upload_document("brd.pdf", b"%PDF-1.7".to_vec())
        .await
        .unwrap();
    assert_eq!(doc.name.as_deref(), Some("brd.pdf"));
    assert_eq!(doc.tags, vec!["brd".to_string()]);

    let seen = server.await.unwrap();
    assert_eq!(seen[0].target, "POST /api/upload_document");
    assert!(seen[0].head.to_ascii_lowercase().contains("multipart/form-data"));
    let body = seen[0].body_text();
    assert!(body.contains(r#"name="file"; filename="brd.pdf""#));
    assert!(body.contains("%PDF-1.7"));
}

#[tokio::test]
async fn integration_status_uses_platform_route() {
    let (client, server) = serve(vec![
        Canned::json(200, json!({"configured": true, "connected": false, "message": "PAT expired"})),
        Canned::json(200, json!({"success": true, "message": "ok"})),
    ])
    .await;
    let status = client.integration_status(Platform::Jira).await.unwrap();
    assert!(status.configured && !status.connected);
    assert_eq!(status.message, "PAT expired");
    assert!(client.test_ado_connection().await.unwrap().success);

    let seen = server.await.unwrap();
    assert_eq!(seen[0].target, "GET /api/jira/status");
    assert_eq!(seen[1].target, "POST /api/ado/test");
}

#[tokio::test]
async fn ado_projects_are_empty_when_unavailable() {
    let (client, server) = serve(vec![
        Canned::json(200, json!([{"id": "p1", "name": "Banking"}])),
        Canned::json(404, json!({"error": "not found"})),
        Canned::json(200, json!({"projects": []})),
    ])
    .await;
    let projects = client.ado_projects().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["name"], "Banking");
    assert!(client.ado_projects().await.unwrap().is_empty());
    assert!(client.ado_projects().await.unwrap().is_empty());

    let seen = server.await.unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|r| r.target == "GET /api/ado/projects"));
}
