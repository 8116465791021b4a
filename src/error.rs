use thiserror::Error;

/// Errors produced by the config store and the API client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0} is not set, run with --pass and/or --addr first")]
    MissingSettings(&'static str),

    #[error("cannot use --pass or --addr together with --text, --file or --clip")]
    FlagConflict,

    #[error("refusing to send an empty {0}")]
    EmptyText(&'static str),

    #[error("server still requires login after re-authenticating")]
    LoginRequired,

    #[error("login succeeded but the server did not set a session cookie")]
    MissingCookie,

    #[error("server returned {status}: {body}")]
    Api { status: u16, body: String },
}

pub type ClientResult<T> = Result<T, ClientError>;
