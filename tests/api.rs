//! API client behaviour against a mocked server.
//!
//! The client is blocking, so every call runs on a `spawn_blocking` thread
//! while wiremock serves from the async runtime.

use penny::api::ApiClient;
use penny::error::PennyError;
use penny::models::{ClientInput, InvoiceStatus};
use penny::session::{self, Session};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}

fn stored(access: &str, refresh: &str) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        email: "ana@studio.id".to_string(),
    }
}

fn user_json() -> serde_json::Value {
    json!({
        "id": 1,
        "name": "Ana Putri",
        "email": "ana@studio.id",
        "address": "Jl. Kemang 5",
        "phone": "08123456789",
        "bank_name": "BCA",
        "bank_account_name": "Ana Putri",
        "bank_account_number": "1234567890"
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn login_stores_tokens_and_fetches_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/public/auth/sign-in"))
        .and(body_json(json!({"email": "ana@studio.id", "password": "secret1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"access_token": "a1", "refresh_token": "r1"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/protected/me"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("session.json");
    let uri = server.uri();
    let target = file.clone();
    let user = blocking(move || {
        let api = ApiClient::new(&uri).unwrap().persist_to(target);
        api.login("ana@studio.id", "secret1")
    })
    .await
    .unwrap();

    assert_eq!(user.name, "Ana Putri");
    let saved = session::load_from(&file).unwrap();
    assert_eq!(saved.access_token, "a1");
    assert_eq!(saved.refresh_token, "r1");
    assert_eq!(saved.email, "ana@studio.id");
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_password_reads_as_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/public/auth/sign-in"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || ApiClient::new(&uri).unwrap().login("ana@studio.id", "nope"))
        .await
        .unwrap_err();
    match err {
        PennyError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("unexpected {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_access_token_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/protected/invoices"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/public/auth/refresh-token"))
        .and(body_json(json!({"refresh_token": "r1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/protected/invoices"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 3, "invoice_number": "INV-3", "client_name": "Acme",
                      "due_date": "2026-11-18", "status": "sent", "total": 150000.0}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("session.json");
    let uri = server.uri();
    let target = file.clone();
    let invoices = blocking(move || {
        let api = ApiClient::new(&uri)
            .unwrap()
            .with_session(Some(stored("stale", "r1")))
            .persist_to(target);
        api.list_invoices()
    })
    .await
    .unwrap();

    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].status, InvoiceStatus::Sent);
    let saved = session::load_from(&file).unwrap();
    assert_eq!(saved.access_token, "fresh");
    // The server omitted a new refresh token; the old one is kept.
    assert_eq!(saved.refresh_token, "r1");
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_refresh_surfaces_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/protected/clients"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/public/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || {
        ApiClient::new(&uri)
            .unwrap()
            .with_session(Some(stored("stale", "r1")))
            .list_clients()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, PennyError::Unauthorized));
}

#[tokio::test(flavor = "multi_thread")]
async fn restore_discards_a_rejected_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/protected/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("session.json");
    session::save_to(&file, &stored("stale", "")).unwrap();

    let uri = server.uri();
    let target = file.clone();
    let restored = blocking(move || {
        let api = ApiClient::new(&uri)
            .unwrap()
            .with_session(session::load_from(&target))
            .persist_to(target);
        let user = api.restore();
        (user, api.is_authenticated())
    })
    .await;

    let (user, still_authenticated) = restored;
    assert_eq!(user.unwrap(), None);
    assert!(!still_authenticated);
    assert!(!file.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn api_errors_carry_the_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/protected/clients"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"error": "Client email already exists"})),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || {
        let input = ClientInput {
            name: "Acme".into(),
            email: Some("ap@acme.test".into()),
            ..ClientInput::default()
        };
        ApiClient::new(&uri)
            .unwrap()
            .with_session(Some(stored("a1", "")))
            .create_client(&input)
    })
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "API error (422): Client email already exists");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_lists_and_wrapped_summary_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/protected/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/protected/invoices/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"paid": 250000.0, "total_revenue": 400000.0}
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let (clients, summary) = blocking(move || {
        let api = ApiClient::new(&uri).unwrap().with_session(Some(stored("a1", "")));
        (api.list_clients(), api.invoice_summary())
    })
    .await;
    assert!(clients.unwrap().is_empty());
    let summary = summary.unwrap();
    assert_eq!(summary.paid, 250000.0);
    assert_eq!(summary.total_revenue, 400000.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn status_change_and_pdf_download() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/protected/invoices/9/status"))
        .and(body_json(json!({"status": "paid"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/protected/invoices/9/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 test".to_vec()))
        .mount(&server)
        .await;

    let uri = server.uri();
    let bytes = blocking(move || {
        let api = ApiClient::new(&uri).unwrap().with_session(Some(stored("a1", "")));
        api.set_invoice_status(9, InvoiceStatus::Paid)?;
        api.download_invoice(9)
    })
    .await
    .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test(flavor = "multi_thread")]
async fn protected_calls_need_a_session() {
    let server = MockServer::start().await;
    let uri = server.uri();
    let err = blocking(move || ApiClient::new(&uri).unwrap().list_invoices())
        .await
        .unwrap_err();
    assert!(matches!(err, PennyError::NotLoggedIn));
    assert!(server.received_requests().await.unwrap().is_empty());
}
