use axum::response::{IntoResponse, Response};
use fsgate_common::error::GatewayError;
use http::{header, StatusCode};

/// Response mapping for engine errors. Backend error types never reach
/// the client; everything is rendered from the gateway taxonomy here.
#[derive(Debug)]
pub struct HttpError(pub GatewayError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self.0 {
            GatewayError::NotFound(path) => (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "text/html; charset=UTF-8")],
                format!("<html><body><h1>404 Not Found</h1><p>{}</p></body></html>", escape(&path)),
            )
                .into_response(),
            // The unsatisfiable-range response must carry the total
            // length so clients can retry with valid bounds.
            GatewayError::RangeNotSatisfiable { length } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{length}"))],
            )
                .into_response(),
            GatewayError::BackendUnavailable(message) => {
                tracing::error!(%message, "backend unavailable");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            GatewayError::Internal(message) => {
                tracing::error!(%message, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            GatewayError::Io(err) => {
                tracing::error!(error = %err, "i/o error");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl From<GatewayError> for HttpError {
    fn from(err: GatewayError) -> Self {
        HttpError(err)
    }
}

/// Minimal HTML escaping for text interpolated into small pages.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
