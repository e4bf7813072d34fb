use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Bad API token: {0}")]
    BadCredential(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service error (status {status}): {message}")]
    TransientService { status: u16, message: String },

    #[error("{0}: no data")]
    MissingField(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Connection failed: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Error::MissingField("signature".into()).to_string(), "signature: no data");
        assert_eq!(
            Error::TransientService { status: 502, message: "Bad Gateway".into() }.to_string(),
            "Service error (status 502): Bad Gateway"
        );
        assert_eq!(
            Error::invalid_argument("bad range").to_string(),
            "Invalid argument: bad range"
        );
    }
}
