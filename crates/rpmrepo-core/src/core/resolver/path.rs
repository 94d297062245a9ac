use thiserror::Error;

/// Why a request path was rejected with 400.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("[RR201] unknown stage '{0}'")]
    UnknownStage(String),
    #[error("[RR202] stage '{0}' has been retired")]
    RetiredStage(String),
    #[error("[RR203] path contains an empty segment")]
    EmptySegment,
    #[error("[RR204] segment '{0}' is not valid percent-encoded UTF-8")]
    InvalidEncoding(String),
    #[error("[RR205] unknown command '{0}'")]
    UnknownCommand(String),
    #[error("[RR206] '{command}' expects {expected}")]
    BadArity {
        command: &'static str,
        expected: &'static str,
    },
}

impl PathError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownStage(_) => "RR201",
            Self::RetiredStage(_) => "RR202",
            Self::EmptySegment => "RR203",
            Self::InvalidEncoding(_) => "RR204",
            Self::UnknownCommand(_) => "RR205",
            Self::BadArity { .. } => "RR206",
        }
    }
}

/// Splits `path` on `/` and percent-decodes every segment.
///
/// Decoding happens after splitting, so `%2F` yields a `/` inside a segment.
pub fn split_segments(path: &str) -> Result<Vec<String>, PathError> {
    path.split('/')
        .map(|raw| {
            if raw.is_empty() {
                return Err(PathError::EmptySegment);
            }
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .map_err(|_| PathError::InvalidEncoding(raw.to_string()))
        })
        .collect()
}
