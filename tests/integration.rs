use aibook::chat::{ChatSession, HttpChatTransport, QueryOutcome, APOLOGY_MESSAGE};
use aibook_core::models::{ContentRecord, Role};
use axum::{http::StatusCode, routing::post, Router};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn aibook_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("aibook");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let docs = root.join("docs");
    fs::create_dir_all(docs.join("module-1")).unwrap();
    fs::create_dir_all(docs.join("module-3")).unwrap();

    fs::write(
        docs.join("intro.md"),
        "---\ntitle: \"Welcome to the Book\"\n---\n# Ignored Heading\n\nEmbodied AI brings models into the physical world.\n",
    )
    .unwrap();
    fs::write(
        docs.join("module-1").join("1.1-ros-nodes.md"),
        "# Nodes and Topics\n\nA ROS 2 node publishes messages on topics.\n",
    )
    .unwrap();
    fs::write(
        docs.join("module-3").join("3.2-perception.md"),
        "# Perception\n\nIsaac ROS accelerates stereo depth estimation.\n",
    )
    .unwrap();
    fs::write(
        docs.join("no-heading-file.md"),
        "Just a paragraph with no heading about Gazebo worlds.\n",
    )
    .unwrap();
    fs::write(docs.join("notes.txt"), "not markdown").unwrap();

    let config_content = format!(
        r#"[content]
root = "{root}/docs"

[output]
path = "{root}/static/book-content.json"

[chat]
endpoint = "http://127.0.0.1:9/chat"
timeout_secs = 5
"#,
        root = root.display()
    );

    let config_path = root.join("aibook.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn artifact_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap()
        .join("static")
        .join("book-content.json")
}

fn run_aibook(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = aibook_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run aibook binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn read_artifact(config_path: &Path) -> Vec<ContentRecord> {
    let text = fs::read_to_string(artifact_path(config_path)).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_index_writes_one_record_per_markdown_file() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_aibook(&config_path, &["index", "--progress", "off"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("processed: 4 files"));
    assert!(stdout.contains("ok"));

    let records = read_artifact(&config_path);
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "intro",
            "module-1/1.1-ros-nodes",
            "module-3/3.2-perception",
            "no-heading-file"
        ]
    );
}

#[test]
fn test_index_resolves_titles_modules_and_chapters() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_aibook(&config_path, &["index", "--progress", "off"]);
    assert!(success, "index failed: {}", stderr);

    let records = read_artifact(&config_path);
    let by_id = |id: &str| records.iter().find(|r| r.id == id).unwrap().clone();

    let intro = by_id("intro");
    assert_eq!(intro.title, "Welcome to the Book");
    assert_eq!(intro.module, "Introduction");
    assert_eq!(intro.path, "/docs/intro");
    assert!(!intro.content.contains("title:"));

    let perception = by_id("module-3/3.2-perception");
    assert_eq!(perception.title, "Perception");
    assert_eq!(perception.module, "Module 3: AI-Robot Brain (NVIDIA Isaac)");
    assert_eq!(perception.chapter, "perception");
    assert_eq!(perception.path, "/docs/module-3/3.2-perception");

    let nodes = by_id("module-1/1.1-ros-nodes");
    assert_eq!(nodes.module, "Module 1: Robotic Nervous System (ROS 2)");

    assert_eq!(by_id("no-heading-file").title, "No Heading File");
}

#[test]
fn test_index_dry_run_writes_nothing() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_aibook(&config_path, &["index", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("processed: 4 files"));
    assert!(!artifact_path(&config_path).exists());
}

#[test]
fn test_index_isolates_unreadable_file() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("docs").join("broken.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

    let (stdout, stderr, success) = run_aibook(&config_path, &["index"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("failed: 1"));
    assert!(stdout.contains("broken.md"));
    assert_eq!(read_artifact(&config_path).len(), 4);
}

#[test]
fn test_index_strict_fails_without_artifact() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("docs").join("broken.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

    let (_, stderr, success) = run_aibook(&config_path, &["index", "--strict"]);
    assert!(!success, "strict index should fail");
    assert!(stderr.contains("strict"));
    assert!(!artifact_path(&config_path).exists());
}

#[test]
fn test_search_after_index() {
    let (_tmp, config_path) = setup_test_env();
    run_aibook(&config_path, &["index"]);

    let (stdout, stderr, success) = run_aibook(&config_path, &["search", "ISAAC"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("Perception"));
    assert!(!stdout.contains("Nodes and Topics"));

    let (stdout, _, success) = run_aibook(&config_path, &["search", "module", "--json"]);
    assert!(success);
    let hits: Vec<ContentRecord> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn test_search_missing_artifact_is_empty() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_aibook(&config_path, &["search", "anything"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_stats_reports_modules() {
    let (_tmp, config_path) = setup_test_env();
    run_aibook(&config_path, &["index"]);

    let (stdout, stderr, success) = run_aibook(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Records:     4"));
    assert!(stdout.contains("Introduction"));
    assert!(stdout.contains("Module 3: AI-Robot Brain (NVIDIA Isaac)"));
}

#[test]
fn test_explicit_missing_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_aibook(&tmp.path().join("absent.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("config"));
}

#[test]
fn test_one_shot_chat_to_unreachable_endpoint_prints_apology() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_aibook(&config_path, &["chat", "What is ROS2?"]);
    assert!(success, "chat failed: {}", stderr);
    assert!(stdout.contains(APOLOGY_MESSAGE));
}

// ============ Chat over HTTP ============

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/chat", addr)
}

fn sample_records() -> Vec<ContentRecord> {
    vec![ContentRecord::new(
        "module-1/1.1-ros-nodes",
        "Nodes and Topics",
        "A ROS 2 node publishes messages on topics.",
        "Module 1: Robotic Nervous System (ROS 2)",
        "ros nodes",
    )]
}

#[tokio::test]
async fn test_chat_against_preview_server() {
    let endpoint = spawn(aibook::server::router(sample_records())).await;
    let transport = HttpChatTransport::new(endpoint, None).unwrap();
    let mut session = ChatSession::new(transport, None);

    let outcome = session
        .submit_query("How do topics work?", false, None)
        .await
        .unwrap();
    assert_eq!(outcome, QueryOutcome::Success);

    let msgs = session.messages();
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].role, Role::User);
    assert_eq!(msgs[1].role, Role::Assistant);
    assert_eq!(
        msgs[1].citations,
        Some(vec![
            "Module: Module 1: Robotic Nervous System (ROS 2), Chapter: ros nodes".to_string()
        ])
    );
}

#[tokio::test]
async fn test_chat_selected_text_against_preview_server() {
    let endpoint = spawn(aibook::server::router(sample_records())).await;
    let transport = HttpChatTransport::new(endpoint, None).unwrap();
    let mut session = ChatSession::new(transport, None);

    session
        .submit_query("Explain", true, Some("QoS profiles"))
        .await
        .unwrap();
    let reply = &session.messages()[1];
    assert!(reply.content.contains("QoS profiles"));
    assert_eq!(reply.citations, Some(vec!["Selected Text Only".to_string()]));
}

#[tokio::test]
async fn test_chat_server_error_yields_apology() {
    let app = Router::new().route(
        "/chat",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let endpoint = spawn(app).await;
    let transport = HttpChatTransport::new(endpoint, None).unwrap();
    let mut session = ChatSession::new(transport, Some("Hello!"));

    let outcome = session.submit_query("Anything?", false, None).await.unwrap();
    assert_eq!(outcome, QueryOutcome::Failure);

    let msgs = session.messages();
    assert_eq!(msgs.len(), 3);
    assert_eq!(msgs[2].content, APOLOGY_MESSAGE);
    assert_eq!(msgs[2].citations, None);
    assert!(!session.is_pending());
}

#[tokio::test]
async fn test_chat_closed_port_yields_apology() {
    let transport = HttpChatTransport::new("http://127.0.0.1:9/chat", None).unwrap();
    let mut session = ChatSession::new(transport, None);

    let outcome = session.submit_query("Anything?", false, None).await.unwrap();
    assert_eq!(outcome, QueryOutcome::Failure);
    assert_eq!(session.messages()[1].content, APOLOGY_MESSAGE);
    assert!(!session.is_pending());
}

#[tokio::test]
async fn test_preview_server_rejects_overlong_query() {
    let endpoint = spawn(aibook::server::router(sample_records())).await;
    let body = serde_json::json!({
        "query": "x".repeat(1001),
        "use_selected_text": false
    });
    let resp = reqwest::Client::new()
        .post(&endpoint)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let err: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_preview_server_rejects_malformed_body_as_json_error() {
    let endpoint = spawn(aibook::server::router(sample_records())).await;
    let client = reqwest::Client::new();

    for body in [r#"{"use_selected_text":false}"#, "{not json"] {
        let resp = client
            .post(&endpoint)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "body: {}", body);
        let err: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], "bad_request");
        assert!(err["error"]["message"].is_string());
    }
}

#[tokio::test]
async fn test_preview_server_ignores_empty_selection() {
    let endpoint = spawn(aibook::server::router(sample_records())).await;
    let body = serde_json::json!({
        "query": "How do topics work?",
        "use_selected_text": true,
        "selected_text": ""
    });
    let resp = reqwest::Client::new()
        .post(&endpoint)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let reply: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        reply["citations"],
        serde_json::json!(["Module: Module 1: Robotic Nervous System (ROS 2), Chapter: ros nodes"])
    );
}
