use thiserror::Error;

/// Classified failure reasons surfaced by the tap engine.
#[derive(Debug, Clone, Error)]
pub enum TapErrorKind {
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("no tokio runtime available to drive deferred classification")]
    NoRuntime,
}

/// Error wrapper keeping the kind inspectable.
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct TapError(pub TapErrorKind);

impl TapError {
    pub fn kind(&self) -> &TapErrorKind {
        &self.0
    }
}

impl From<TapErrorKind> for TapError {
    fn from(kind: TapErrorKind) -> Self {
        TapError(kind)
    }
}

pub type TapResult<T> = Result<T, TapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_preserved_through_the_wrapper() {
        let err: TapError = TapErrorKind::InvalidPolicy("bad".into()).into();
        assert!(matches!(err.kind(), TapErrorKind::InvalidPolicy(_)));
        assert_eq!(err.to_string(), "invalid policy: bad");
    }
}
