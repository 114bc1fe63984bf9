mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medrax::backend::BackendClient;
use medrax::error::MedraxError;
use medrax::session::{
    Notice, ReportState, Session, FOLLOWUP_FAILURE_MESSAGE, FOLLOWUP_PRECONDITION_MESSAGE,
    NO_ANSWER_MESSAGE, NO_REPORT_MESSAGE, REPORT_ERROR_MESSAGE,
};
use medrax::upload::UploadedImage;

use common::{backend_for, default_analysis, temp_png, unreachable_uri, PNG_BYTES};

fn client_for(server: &MockServer) -> BackendClient {
    BackendClient::new(backend_for(&server.uri()), default_analysis()).unwrap()
}

/// Upload, receive report and session id, then ask one follow-up
#[tokio::test]
async fn test_report_then_followup_records_exchange() {
    let server = MockServer::start().await;
    let (_dir, image_path) = temp_png("xray1.png");

    Mock::given(method("POST"))
        .and(path("/analyze-image-json"))
        .and(body_partial_json(json!({
            "payload": {
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": default_analysis().user_prompt},
                        {"inlineData": {"mimeType": "image/png"}}
                    ]
                }]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "Findings: ... Impression: ...",
            "history_id": "abc123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ask-followup"))
        .and(body_partial_json(json!({
            "history_id": "abc123",
            "question": "What is the impression?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Mild opacity."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let image = UploadedImage::from_path(&image_path).await.unwrap();
    assert_eq!(image.media_type(), "image/png");

    let mut session = Session::new();
    session.upload_image(&client, image).await;

    assert!(!session.is_loading());
    assert_eq!(session.display_report(), "Findings: ... Impression: ...");
    assert_eq!(session.history_id(), Some("abc123"));
    assert_eq!(session.image().map(|i| i.file_name()), Some("xray1.png"));

    session.set_question("What is the impression?");
    let exchange = session.ask_followup(&client).await.unwrap().clone();

    assert_eq!(exchange.question, "What is the impression?");
    assert_eq!(exchange.answer, "Mild opacity.");
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.question(), "");
}

/// The image travels as bare base64 inside the payload
#[tokio::test]
async fn test_analyze_sends_encoded_image() {
    let server = MockServer::start().await;
    let image = UploadedImage::from_bytes(PNG_BYTES.to_vec(), "image/png", "xray1.png").unwrap();

    Mock::given(method("POST"))
        .and(path("/analyze-image-json"))
        .and(body_partial_json(json!({
            "payload": {
                "contents": [{
                    "parts": [
                        {},
                        {"inlineData": {"data": image.encoded_payload()}}
                    ]
                }]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).analyze(&image).await.unwrap();
    assert_eq!(response.text.as_deref(), Some("ok"));
    assert_eq!(response.history_id, None);
}

#[tokio::test]
async fn test_missing_report_text_shows_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze-image-json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "history_id": "abc123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let image = UploadedImage::from_bytes(PNG_BYTES.to_vec(), "image/png", "xray1.png").unwrap();
    let mut session = Session::new();
    session.upload_image(&client_for(&server), image).await;

    assert_eq!(session.report(), &ReportState::Missing);
    assert_eq!(session.display_report(), NO_REPORT_MESSAGE);
    assert_eq!(session.history_id(), Some("abc123"));
}

#[tokio::test]
async fn test_server_error_sets_report_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze-image-json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let image = UploadedImage::from_bytes(PNG_BYTES.to_vec(), "image/png", "xray1.png").unwrap();
    let mut session = Session::new();
    session.upload_image(&client_for(&server), image).await;

    assert_eq!(session.report(), &ReportState::Failed);
    assert_eq!(session.display_report(), REPORT_ERROR_MESSAGE);
    assert!(!session.is_loading());
    assert_eq!(session.history_id(), None);
}

#[tokio::test]
async fn test_non_json_body_sets_report_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze-image-json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let image = UploadedImage::from_bytes(PNG_BYTES.to_vec(), "image/png", "xray1.png").unwrap();
    let mut session = Session::new();
    session.upload_image(&client_for(&server), image).await;

    assert_eq!(session.display_report(), REPORT_ERROR_MESSAGE);
    assert!(!session.is_loading());
}

/// A question without a report session never reaches the network
#[tokio::test]
async fn test_followup_without_session_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ask-followup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = Session::new();
    session.set_question("Is there a fracture?");
    let err = session.ask_followup(&client_for(&server)).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MedraxError>(),
        Some(MedraxError::FollowUpRefused(_))
    ));
    assert_eq!(
        session.notice().map(|n| n.message()),
        Some(FOLLOWUP_PRECONDITION_MESSAGE)
    );
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_followup_without_answer_uses_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ask-followup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = Session::resume("Impression: clear.", Some("abc123".to_string()));
    session.set_question("Anything else?");
    let exchange = session.ask_followup(&client_for(&server)).await.unwrap();

    assert_eq!(exchange.answer, NO_ANSWER_MESSAGE);
}

#[tokio::test]
async fn test_followup_server_error_keeps_history_and_question() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ask-followup"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = Session::resume("Impression: clear.", Some("abc123".to_string()));
    session.set_question("Anything else?");
    assert!(session.ask_followup(&client_for(&server)).await.is_err());

    assert!(session.history().is_empty());
    assert_eq!(session.question(), "Anything else?");
    assert_eq!(
        session.take_notice(),
        Some(Notice::Failure(FOLLOWUP_FAILURE_MESSAGE.to_string()))
    );
}

/// A new upload discards the previous session before the request completes
#[tokio::test]
async fn test_new_upload_resets_previous_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze-image-json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = Session::resume("Old report", Some("old-id".to_string()));
    let image = UploadedImage::from_bytes(PNG_BYTES.to_vec(), "image/jpeg", "xray2.jpg").unwrap();
    session.upload_image(&client_for(&server), image).await;

    assert_eq!(session.history_id(), None);
    assert!(session.history().is_empty());
    assert_eq!(session.display_report(), REPORT_ERROR_MESSAGE);
}

/// Empty strings count as absent for both the report and the session id
#[tokio::test]
async fn test_empty_text_and_history_id_are_absent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze-image-json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "",
            "history_id": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ask-followup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let image = UploadedImage::from_bytes(PNG_BYTES.to_vec(), "image/png", "xray1.png").unwrap();
    let mut session = Session::new();
    session.upload_image(&client, image).await;

    assert_eq!(session.display_report(), NO_REPORT_MESSAGE);
    assert_eq!(session.history_id(), None);

    session.set_question("What is the impression?");
    assert!(session.ask_followup(&client).await.is_err());
    assert!(session.history().is_empty());
}

/// Dropping an in-flight upload still clears the loading flag
#[tokio::test]
async fn test_cancelled_upload_clears_loading() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze-image-json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"text": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let image = UploadedImage::from_bytes(PNG_BYTES.to_vec(), "image/png", "xray1.png").unwrap();
    let mut session = Session::new();

    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        session.upload_image(&client, image),
    )
    .await;

    assert!(outcome.is_err());
    assert!(!session.is_loading());
    assert_eq!(session.report(), &ReportState::Empty);
}

#[tokio::test]
async fn test_unreachable_backend_sets_report_error_message() {
    let client = BackendClient::new(backend_for(&unreachable_uri()), default_analysis()).unwrap();
    let image = UploadedImage::from_bytes(PNG_BYTES.to_vec(), "image/png", "xray1.png").unwrap();

    let err = client.analyze(&image).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MedraxError>(),
        Some(MedraxError::Http(_))
    ));

    let mut session = Session::new();
    session.upload_image(&client, image).await;

    assert_eq!(session.report(), &ReportState::Failed);
    assert_eq!(session.display_report(), REPORT_ERROR_MESSAGE);
    assert!(!session.is_loading());
}
