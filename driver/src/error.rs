use thiserror::Error;

/// Failure of a single call to the hosted model.
///
/// Callers treat every variant as "no usable text": the current turn is
/// abandoned, the process keeps running.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to the model API failed: {0}")]
    Transport(String),

    #[error("the model API rejected the credential (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("the model API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response from the model API: {0}")]
    Malformed(String),

    #[error("the model returned no usable text ({0})")]
    Empty(String),
}

impl From<ureq::Error> for GenerationError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                let message = api_message(&body).unwrap_or(body);

                // An unknown key comes back as 400 INVALID_ARGUMENT rather than 401.
                if matches!(status, 401 | 403) || (status == 400 && message.contains("API key")) {
                    Self::Auth { status, message }
                } else {
                    Self::Api { status, message }
                }
            }
            ureq::Error::Transport(transport) => Self::Transport(transport.to_string()),
        }
    }
}

#[derive(serde::Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(serde::Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn api_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|body| body.error.message)
}
