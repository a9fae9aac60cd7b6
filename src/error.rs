use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized { realm: String },

    #[error("Access denied")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// Raw message from the speech provider, passed through to the caller as is.
    #[error("{0}")]
    Provider(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // Provider failures keep the default status; the message is the payload.
            AppError::Provider(_) => StatusCode::OK,
            AppError::IoError(_) | AppError::JsonError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match &self {
            AppError::Provider(_) | AppError::IoError(_) | AppError::JsonError(_) => {
                tracing::error!("Request failed: {} - {}", status, message);
            }
            _ => tracing::warn!("Request rejected: {} - {}", status, message),
        }

        let mut response = (status, message).into_response();

        if let AppError::Unauthorized { realm } = &self {
            let challenge = format!("Basic realm=\"{}\"", realm.replace('"', ""));
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}
