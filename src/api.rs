//! Blocking client for the remote invoice API.
//!
//! All persistence, PDF rendering and token issuance happen server-side; this
//! module only shapes requests and decodes responses. Responses are accepted
//! both bare and wrapped in `{ "data": ... }`.

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PennyError, Result};
use crate::models::{
    BankingUpdate, Client, ClientInput, Invoice, InvoiceInput, InvoiceStatus, InvoiceSummary,
    PasswordChange, ProfileUpdate, PublicInvoiceRequest, RefreshRequest, SignInRequest,
    SignUpRequest, StatusUpdate, TokenPair, User,
};
use crate::session::{self, Session};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(v) => v,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Pull a human-readable message out of an error response body.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.message.or(parsed.error) {
            if !msg.trim().is_empty() {
                return msg;
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 200 && !trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(PennyError::Unauthorized);
    }
    let body = resp.text().unwrap_or_default();
    Err(PennyError::Api {
        status: status.as_u16(),
        message: error_message(&body, status),
    })
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let text = resp.text()?;
    let envelope: Envelope<T> = serde_json::from_str(&text)?;
    Ok(envelope.into_inner())
}

pub struct ApiClient {
    base_url: String,
    http: HttpClient,
    session: RefCell<Option<Session>>,
    persist_path: Option<PathBuf>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            session: RefCell::new(None),
            persist_path: None,
        })
    }

    pub fn with_session(self, session: Option<Session>) -> Self {
        *self.session.borrow_mut() = session;
        self
    }

    /// Write refreshed or newly issued tokens to `path`.
    pub fn persist_to(mut self, path: PathBuf) -> Self {
        self.persist_path = Some(path);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.session
            .borrow()
            .as_ref()
            .is_some_and(|s| !s.is_empty())
    }

    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    fn set_session(&self, session: Option<Session>) -> Result<()> {
        if let Some(path) = &self.persist_path {
            match &session {
                Some(s) => session::save_to(path, s)?,
                None => session::clear_at(path)?,
            }
        }
        *self.session.borrow_mut() = session;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    fn dispatch<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        auth: bool,
    ) -> Result<Response> {
        let mut req = self.http.request(method, self.url(path));
        if auth {
            if let Some(s) = self.session.borrow().as_ref() {
                req = req.bearer_auth(&s.access_token);
            }
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        Ok(req.send()?)
    }

    /// Send a request. Protected calls that come back 401 get one token
    /// refresh and one retry before the error surfaces.
    fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        auth: bool,
    ) -> Result<Response> {
        if auth && !self.is_authenticated() {
            return Err(PennyError::NotLoggedIn);
        }
        debug!(%method, path, "api request");
        let resp = self.dispatch(method.clone(), path, body, auth)?;
        if auth && resp.status() == StatusCode::UNAUTHORIZED && self.try_refresh()? {
            debug!(%method, path, "retrying after token refresh");
            let retry = self.dispatch(method, path, body, auth)?;
            return check(retry);
        }
        check(resp)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(self.execute::<()>(Method::GET, path, None, true)?)
    }

    fn send_json<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: &B) -> Result<()> {
        self.execute(method, path, Some(body), true)?;
        Ok(())
    }

    fn bytes(resp: Response) -> Result<Vec<u8>> {
        Ok(resp.bytes()?.to_vec())
    }

    fn try_refresh(&self) -> Result<bool> {
        let (refresh_token, email) = match self.session.borrow().as_ref() {
            Some(s) if s.can_refresh() => (s.refresh_token.clone(), s.email.clone()),
            _ => return Ok(false),
        };
        let body = RefreshRequest {
            refresh_token: &refresh_token,
        };
        let resp = self.dispatch(Method::POST, "/public/auth/refresh-token", Some(&body), false)?;
        if !resp.status().is_success() {
            warn!(status = resp.status().as_u16(), "token refresh rejected");
            return Ok(false);
        }
        let mut tokens: TokenPair = decode(resp)?;
        if tokens.refresh_token.is_empty() {
            tokens.refresh_token = refresh_token;
        }
        self.set_session(Some(Session::from_tokens(tokens, &email)))?;
        info!("access token refreshed");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    pub fn sign_up(&self, req: &SignUpRequest) -> Result<()> {
        self.execute(Method::POST, "/public/auth/sign-up", Some(req), false)?;
        info!(email = %req.email, "account registered");
        Ok(())
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair> {
        let body = SignInRequest { email, password };
        match self.execute(Method::POST, "/public/auth/sign-in", Some(&body), false) {
            Ok(resp) => decode(resp),
            Err(PennyError::Unauthorized) => Err(PennyError::Api {
                status: 401,
                message: "Invalid email or password".into(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Sign in, keep the tokens, then fetch the profile.
    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        let tokens = self.sign_in(email, password)?;
        self.set_session(Some(Session::from_tokens(tokens, email)))?;
        info!(email, "logged in");
        self.me()
    }

    /// Register, then log straight in with the same credentials.
    pub fn register(&self, req: &SignUpRequest) -> Result<User> {
        self.sign_up(req)?;
        self.login(&req.email, &req.password)
    }

    pub fn logout(&self) -> Result<()> {
        self.set_session(None)?;
        info!("logged out");
        Ok(())
    }

    /// Validate a stored session at startup; a session the server rejects is
    /// discarded.
    pub fn restore(&self) -> Result<Option<User>> {
        if !self.is_authenticated() {
            return Ok(None);
        }
        match self.me() {
            Ok(user) => Ok(Some(user)),
            Err(PennyError::Unauthorized) => {
                warn!("stored session rejected, discarding");
                self.set_session(None)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn me(&self) -> Result<User> {
        self.get("/protected/me")
    }

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<()> {
        self.send_json(Method::PUT, "/protected/me/profile", update)
    }

    pub fn update_banking(&self, update: &BankingUpdate) -> Result<()> {
        self.send_json(Method::PUT, "/protected/me/banking", update)
    }

    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        let body = PasswordChange {
            old_password,
            new_password,
        };
        self.send_json(Method::PUT, "/protected/me/change-password", &body)
    }

    pub fn deactivate(&self) -> Result<()> {
        self.execute::<()>(Method::DELETE, "/protected/me/deactivate", None, true)?;
        self.set_session(None)
    }

    // -----------------------------------------------------------------------
    // Clients
    // -----------------------------------------------------------------------

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        Ok(self.get::<Option<Vec<Client>>>("/protected/clients")?.unwrap_or_default())
    }

    pub fn get_client(&self, id: i64) -> Result<Client> {
        self.get(&format!("/protected/clients/{id}"))
    }

    pub fn create_client(&self, input: &ClientInput) -> Result<()> {
        self.send_json(Method::POST, "/protected/clients", input)
    }

    pub fn update_client(&self, id: i64, input: &ClientInput) -> Result<()> {
        self.send_json(Method::PUT, &format!("/protected/clients/{id}"), input)
    }

    pub fn delete_client(&self, id: i64) -> Result<()> {
        self.execute::<()>(Method::DELETE, &format!("/protected/clients/{id}"), None, true)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Invoices
    // -----------------------------------------------------------------------

    pub fn list_invoices(&self) -> Result<Vec<Invoice>> {
        Ok(self.get::<Option<Vec<Invoice>>>("/protected/invoices")?.unwrap_or_default())
    }

    pub fn get_invoice(&self, id: i64) -> Result<Invoice> {
        self.get(&format!("/protected/invoices/{id}"))
    }

    pub fn invoice_summary(&self) -> Result<InvoiceSummary> {
        self.get("/protected/invoices/summary")
    }

    pub fn create_invoice(&self, input: &InvoiceInput) -> Result<()> {
        self.send_json(Method::POST, "/protected/invoices", input)
    }

    pub fn update_invoice(&self, id: i64, input: &InvoiceInput) -> Result<()> {
        self.send_json(Method::PUT, &format!("/protected/invoices/{id}"), input)
    }

    pub fn delete_invoice(&self, id: i64) -> Result<()> {
        self.execute::<()>(Method::DELETE, &format!("/protected/invoices/{id}"), None, true)?;
        Ok(())
    }

    pub fn set_invoice_status(&self, id: i64, status: InvoiceStatus) -> Result<()> {
        self.send_json(
            Method::PATCH,
            &format!("/protected/invoices/{id}/status"),
            &StatusUpdate { status },
        )
    }

    /// Server-rendered PDF for a saved invoice.
    pub fn download_invoice(&self, id: i64) -> Result<Vec<u8>> {
        let resp = self.execute::<()>(Method::GET, &format!("/protected/invoices/{id}/pdf"), None, true)?;
        Self::bytes(resp)
    }

    pub fn send_invoice_email(&self, id: i64) -> Result<()> {
        self.execute::<()>(
            Method::POST,
            &format!("/protected/invoices/{id}/send-email"),
            None,
            true,
        )?;
        info!(id, "invoice email requested");
        Ok(())
    }

    /// Unauthenticated one-shot generation: the server renders and returns a PDF
    /// without storing anything.
    pub fn generate_public_invoice(&self, req: &PublicInvoiceRequest) -> Result<Vec<u8>> {
        let resp = self.execute(Method::POST, "/public/invoices/generate-pdf", Some(req), false)?;
        Self::bytes(resp)
    }
}
