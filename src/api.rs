// API client module: a small blocking HTTP client for the go-send server.
// Every call goes through `ApiClient::call`, which attaches the stored
// credentials and re-authenticates once when the server asks for a login.

use crate::config::{Config, ConfigStore, SessionCookie};
use crate::error::{ClientError, ClientResult};
use reqwest::blocking::{multipart, Client};
use reqwest::header::COOKIE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const LOGIN_PATH: &str = "/api/login";
pub const LAST_TEXT_PATH: &str = "/cli/last-text";
pub const ADD_TEXT_PATH: &str = "/cli/add-text";
pub const ADD_CLIP_PATH: &str = "/cli/add-clip";
pub const ADD_PHOTO_PATH: &str = "/cli/add-photo";

/// Compared case-insensitively against the `Message` of error responses.
const LOGIN_REQUIRED_MARKER: &str = "require login";

/// Envelope the server uses for both payloads and error descriptions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ServerMessage {
    #[serde(alias = "message")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// `application/x-www-form-urlencoded` body.
    Form(Vec<(String, String)>),
    /// `multipart/form-data` body: text fields plus one `file` part.
    Multipart {
        fields: Vec<(String, String)>,
        file: PathBuf,
    },
}

/// A POST to `path`, relative to the configured server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub path: String,
    pub payload: Payload,
    pub cookie: Option<SessionCookie>,
}

impl ApiRequest {
    pub fn form(path: &str, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiRequest {
            path: path.to_string(),
            payload: Payload::Form(fields),
            cookie: None,
        }
    }

    pub fn upload(path: &str, file: &Path) -> Self {
        ApiRequest {
            path: path.to_string(),
            payload: Payload::Multipart {
                fields: Vec::new(),
                file: file.to_path_buf(),
            },
            cookie: None,
        }
    }

    fn push_field(&mut self, name: &str, value: &str) {
        let fields = match &mut self.payload {
            Payload::Form(fields) => fields,
            Payload::Multipart { fields, .. } => fields,
        };
        fields.push((name.to_string(), value.to_string()));
    }

    /// Form or multipart field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let fields = match &self.payload {
            Payload::Form(fields) => fields,
            Payload::Multipart { fields, .. } => fields,
        };
        fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// What came back from the server, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub cookie: Option<SessionCookie>,
}

/// Sends prepared requests. `HttpTransport` is the real implementation.
pub trait Transport {
    fn execute(&self, base_url: &str, request: &ApiRequest) -> ClientResult<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, base_url: &str, request: &ApiRequest) -> ClientResult<RawResponse> {
        (**self).execute(base_url, request)
    }
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, base_url: &str, request: &ApiRequest) -> ClientResult<RawResponse> {
        let url = format!("{}{}", base_url, request.path);
        let mut req = self.client.post(&url);
        if let Some(cookie) = &request.cookie {
            req = req.header(COOKIE, cookie.header_value());
        }
        req = match &request.payload {
            Payload::Form(fields) => req.form(fields),
            Payload::Multipart { fields, file } => {
                let mut form = multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                req.multipart(form.file("file", file)?)
            }
        };

        let res = req.send()?;
        let status = res.status().as_u16();
        let cookie = res.cookies().next().map(|c| SessionCookie {
            name: c.name().to_string(),
            value: c.value().to_string(),
        });
        let body = res.text()?;
        Ok(RawResponse {
            status,
            body,
            cookie,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    NeedsLogin,
    Failed { status: u16, body: String },
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Sort a response into success, "log in first" or failure.
pub fn classify(status: u16, body: &str) -> Outcome {
    if is_success(status) {
        return Outcome::Success(body.to_string());
    }
    match serde_json::from_str::<ServerMessage>(body) {
        Ok(msg) if msg.message.to_lowercase().contains(LOGIN_REQUIRED_MARKER) => {
            Outcome::NeedsLogin
        }
        Err(_) if status == 401 => Outcome::NeedsLogin,
        _ => Outcome::Failed {
            status,
            body: body.to_string(),
        },
    }
}

/// The `Message` of an envelope, or the body as-is when it isn't one.
pub fn message_or_body(body: &str) -> String {
    match serde_json::from_str::<ServerMessage>(body) {
        Ok(msg) => msg.message,
        Err(_) => body.to_string(),
    }
}

fn finish(outcome: Outcome) -> ClientResult<String> {
    match outcome {
        Outcome::Success(body) => Ok(body),
        Outcome::NeedsLogin => Err(ClientError::LoginRequired),
        Outcome::Failed { status, body } => Err(ClientError::Api { status, body }),
    }
}

/// Holds the transport, the current settings and the store that persists
/// the session cookie after a login.
pub struct ApiClient<T: Transport = HttpTransport> {
    transport: T,
    config: Config,
    store: ConfigStore,
}

impl ApiClient<HttpTransport> {
    pub fn connect(config: Config, store: ConfigStore) -> ClientResult<Self> {
        ApiClient::new(HttpTransport::new()?, config, store)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Fails unless both address and password are set.
    pub fn new(transport: T, config: Config, store: ConfigStore) -> ClientResult<Self> {
        config.validate()?;
        Ok(ApiClient {
            transport,
            config,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The session cookie when there is one, the password field otherwise.
    fn authorize(&self, request: &ApiRequest) -> ApiRequest {
        let mut request = request.clone();
        match &self.config.cookie {
            Some(cookie) => request.cookie = Some(cookie.clone()),
            None => request.push_field("password", &self.config.password),
        }
        request
    }

    fn send_once(&self, request: &ApiRequest) -> ClientResult<Outcome> {
        let request = self.authorize(request);
        debug!(
            path = %request.path,
            with_cookie = request.cookie.is_some(),
            "sending request"
        );
        let res = self.transport.execute(&self.config.address, &request)?;
        debug!(status = res.status, "response received");
        Ok(classify(res.status, &res.body))
    }

    /// Send `request`; if the server asks for a login, log in and try again
    /// exactly once.
    pub fn call(&mut self, request: &ApiRequest) -> ClientResult<String> {
        match self.send_once(request)? {
            Outcome::NeedsLogin => {
                info!("server requires login, signing in");
                self.login()?;
                finish(self.send_once(request)?)
            }
            outcome => finish(outcome),
        }
    }

    /// Exchange the password for a session cookie and persist it.
    pub fn login(&mut self) -> ClientResult<()> {
        let request = ApiRequest::form(LOGIN_PATH, &[("password", self.config.password.as_str())]);
        let res = self.transport.execute(&self.config.address, &request)?;
        if !is_success(res.status) {
            return Err(ClientError::Api {
                status: res.status,
                body: res.body,
            });
        }
        let cookie = res.cookie.ok_or(ClientError::MissingCookie)?;
        self.config.cookie = Some(cookie);
        self.store.save(&self.config)?;
        info!("logged in, session cookie saved");
        Ok(())
    }

    /// The most recent text memo.
    pub fn last_text(&mut self) -> ClientResult<String> {
        let body = self.call(&ApiRequest::form(LAST_TEXT_PATH, &[]))?;
        Ok(message_or_body(&body))
    }

    pub fn add_text(&mut self, text: &str) -> ClientResult<String> {
        self.send_text(ADD_TEXT_PATH, "text", text)
    }

    /// Put `text` on the server's cloud clipboard.
    pub fn add_clip(&mut self, text: &str) -> ClientResult<String> {
        self.send_text(ADD_CLIP_PATH, "clip", text)
    }

    fn send_text(&mut self, path: &str, what: &'static str, text: &str) -> ClientResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyText(what));
        }
        self.call(&ApiRequest::form(path, &[("text-msg", text)]))
    }

    /// Upload a file as multipart/form-data.
    pub fn add_file(&mut self, file: &Path) -> ClientResult<String> {
        // Surface a missing or unreadable file before touching the network.
        fs::File::open(file)?;
        self.call(&ApiRequest::upload(ADD_PHOTO_PATH, file))
    }
}
