//! End-to-end HTTP tests against an in-memory server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::{Value, json};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use surat_server::config::ServerConfig;
use surat_server::routes::build_router;
use surat_server::state::AppState;
use surat_storage::MemoryBackend;

fn server() -> TestServer {
    server_with(&ServerConfig::default())
}

fn server_with(config: &ServerConfig) -> TestServer {
    let state = Arc::new(AppState::new(Arc::new(MemoryBackend::new()), "test-bucket"));
    TestServer::new(build_router(state, config)).unwrap()
}

/// A minimal DOCX with one paragraph per line.
fn docx(lines: &[&str]) -> Vec<u8> {
    let body: String = lines
        .iter()
        .map(|l| format!(r#"<w:p><w:r><w:t xml:space="preserve">{l}</w:t></w:r></w:p>"#))
        .collect();
    let document = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            r"<w:body>{}</w:body></w:document>",
        ),
        body
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(document.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// The `word/document.xml` of a DOCX, as a string.
fn document_xml(bytes: &[u8]) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}

async fn upload(server: &TestServer, name: &str, bytes: Vec<u8>) -> axum_test::TestResponse {
    server
        .post("/upload-template")
        .multipart(MultipartForm::new().add_part("template", Part::bytes(bytes).file_name(name)))
        .await
}

async fn upload_letter(server: &TestServer) -> String {
    let response = upload(
        server,
        "letter.docx",
        docx(&["Dear t.name, your balance is t.balance."]),
    )
    .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["template"]["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn index_answers() {
    let response = server().get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("Surat"));
    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
}

#[tokio::test]
async fn upload_returns_the_record_with_tags() {
    let server = server();
    let response = upload(
        &server,
        "letter.docx",
        docx(&["Dear t.name, your balance is t.balance.", "Regards, t.name"]),
    )
    .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["template"]["name"], "letter.docx");
    assert_eq!(body["template"]["url"], "store://test-bucket/letter.docx");
    assert_eq!(body["template"]["tags"], json!(["t.balance", "t.name"]));
    assert!(body["template"]["createdAt"].is_string());
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn upload_without_file_is_bad_request() {
    let response = server()
        .post("/upload-template")
        .multipart(MultipartForm::new().add_text("note", "no file here"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn upload_that_is_not_multipart_is_a_json_bad_request() {
    let response = server()
        .post("/upload-template")
        .json(&json!({ "template": "letter.docx" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()), "{body}");
}

#[tokio::test]
async fn duplicate_upload_conflicts_and_records_nothing() {
    let server = server();
    upload_letter(&server).await;

    let response = upload(&server, "letter.docx", docx(&["Another t.thing"])).await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "conflict");

    let list: Vec<Value> = server.get("/templates").await.json();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn corrupt_upload_is_unprocessable() {
    let server = server();
    let response = upload(&server, "notes.docx", b"plain text, not a zip".to_vec()).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "corrupt_archive");

    let list: Vec<Value> = server.get("/templates").await.json();
    assert!(list.is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let config = ServerConfig {
        max_upload_bytes: 1024,
        ..ServerConfig::default()
    };
    let server = server_with(&config);
    let response = upload(&server, "big.docx", vec![b'x'; 64 * 1024]).await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn list_returns_stored_records() {
    let server = server();
    let id = upload_letter(&server).await;
    upload(&server, "second.docx", docx(&["t.other"])).await;

    let response = server.get("/templates").await;
    response.assert_status_ok();
    let list: Vec<Value> = response.json();
    assert_eq!(list.len(), 2);
    assert!(list.iter().any(|t| t["id"] == id.as_str()));
}

#[tokio::test]
async fn generate_from_json_renders_the_document() {
    let server = server();
    let id = upload_letter(&server).await;

    let response = server
        .post("/generate-docx")
        .json(&json!({
            "templateId": id,
            "t.name": "Alex",
            "t.balance": "100",
            "other": "ignored"
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=output.docx"
    );
    let xml = document_xml(response.as_bytes());
    assert!(xml.contains("Dear Alex, your balance is 100."), "{xml}");
    assert!(!xml.contains("t.name"));
    assert!(!xml.contains("ignored"));
}

#[tokio::test]
async fn generate_from_urlencoded_form() {
    let server = server();
    let id = upload_letter(&server).await;

    let response = server
        .post("/generate-docx")
        .form(&[
            ("templateId", id.as_str()),
            ("t.name", "Sam"),
            ("t.balance", "7"),
        ])
        .await;

    response.assert_status_ok();
    let xml = document_xml(response.as_bytes());
    assert!(xml.contains("Dear Sam, your balance is 7."), "{xml}");
}

#[tokio::test]
async fn generate_from_multipart_form() {
    let server = server();
    let id = upload_letter(&server).await;

    let response = server
        .post("/generate-docx")
        .multipart(
            MultipartForm::new()
                .add_text("templateId", id)
                .add_text("t.name", "Kim")
                .add_text("t.balance", "0"),
        )
        .await;

    response.assert_status_ok();
    let xml = document_xml(response.as_bytes());
    assert!(xml.contains("Dear Kim, your balance is 0."), "{xml}");
}

#[tokio::test]
async fn generate_with_empty_mapping_blanks_placeholders() {
    let server = server();
    let id = upload_letter(&server).await;

    let response = server
        .post("/generate-docx")
        .json(&json!({ "templateId": id }))
        .await;

    response.assert_status_ok();
    let xml = document_xml(response.as_bytes());
    assert!(xml.contains("Dear , your balance is ."), "{xml}");
}

#[tokio::test]
async fn generate_without_template_id_is_bad_request() {
    let response = server()
        .post("/generate-docx")
        .json(&json!({ "t.name": "Alex" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn generate_with_unknown_template_is_not_found() {
    let response = server()
        .post("/generate-docx")
        .json(&json!({ "templateId": "does-not-exist" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn broken_template_fails_to_render() {
    let server = server();
    let response = upload(&server, "broken.docx", docx(&["Dear {t.name"])).await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["template"]["id"]
        .as_str()
        .unwrap()
        .to_owned();

    let response = server
        .post("/generate-docx")
        .json(&json!({ "templateId": id, "t.name": "Alex" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "render_failed");
}

#[tokio::test]
async fn register_then_fetch_profile() {
    let server = server();
    let response = server
        .post("/register")
        .json(&json!({
            "email": "ana@example.com",
            "password": "secret1",
            "tempatLahir": "Bandung"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["email"], "ana@example.com");
    let uid = body["uid"].as_str().unwrap().to_owned();

    let response = server.get(&format!("/profile/{uid}")).await;
    response.assert_status_ok();
    let profile: Value = response.json();
    assert_eq!(
        profile,
        json!({
            "uid": uid,
            "email": "ana@example.com",
            "nik": "",
            "tanggalLahir": "",
            "tempatLahir": "Bandung"
        })
    );
}

#[tokio::test]
async fn register_errors() {
    let server = server();
    let missing = server
        .post("/register")
        .json(&json!({ "email": "ana@example.com" }))
        .await;
    missing.assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/register")
        .json(&json!({ "email": "ana@example.com", "password": "secret1" }))
        .await
        .assert_status(StatusCode::CREATED);
    let duplicate = server
        .post("/register")
        .json(&json!({ "email": "ana@example.com", "password": "secret2" }))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let response = server().get("/profile/nobody").await;
    response.assert_status(StatusCode::NOT_FOUND);
}
