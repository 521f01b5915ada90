use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use log::error;

use crate::{db, registration};

/// Plain text status answer. The first line starts with `OK` or `FAIL`;
/// station clients scan for `FAIL` to detect a rejected post.
#[derive(Debug)]
pub struct StatusReply {
    pub status: StatusCode,
    pub ok: bool,
    pub message: String,
    pub details: Vec<String>,
}

impl StatusReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            ok: true,
            message: message.into(),
            details: vec![],
        }
    }

    pub fn fail(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            ok: false,
            message: message.into(),
            details: vec![],
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details.extend(details);
        self
    }

    /// Storage problems are server side; configuration problems are called
    /// out separately so operators know the input was not at fault.
    pub fn storage_failure(err: &db::Error) -> Self {
        error!("storage failure: {}", err);
        match err {
            db::Error::Configuration(_) => Self::fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("server configuration error: {}", err),
            ),
            _ => Self::fail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        }
    }

    pub fn body(&self) -> String {
        let status_line = match (self.ok, self.message.is_empty()) {
            (true, true) => "OK".to_string(),
            (true, false) => format!("OK {}", self.message),
            (false, _) => format!("FAIL {}", self.message),
        };

        std::iter::once(status_line)
            .chain(self.details.iter().cloned())
            .map(|line| line + "\n")
            .collect()
    }
}

impl From<registration::Error> for StatusReply {
    fn from(err: registration::Error) -> Self {
        match err {
            registration::Error::Validation(failure) => {
                Self::fail(StatusCode::BAD_REQUEST, failure.message())
            }
            registration::Error::Storage(e) => Self::storage_failure(&e),
        }
    }
}

impl IntoResponse for StatusReply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.body(),
        )
            .into_response()
    }
}
