use thiserror::Error;

#[derive(Debug, Error)]
pub enum CostError {
    /// A write reached a locked cost record in a way the lock gate does not permit.
    #[error("Locked: {0}")]
    Locked(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-range input, rejected before anything is persisted.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CostError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CostError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CostError::NotFound(msg.into())
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CostError::Locked(_) => "LOCKED",
            CostError::NotFound(_) => "NOT_FOUND",
            CostError::Validation(_) => "VALIDATION_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Policy outcomes are deterministic; only infrastructure faults are not.
    pub fn kind(&self) -> FailureKind {
        match self {
            CostError::Locked(_) | CostError::NotFound(_) | CostError::Validation(_) => {
                FailureKind::Policy
            }
            _ => FailureKind::System,
        }
    }
}

/// Classifies a failure for logging and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// Caller-visible policy outcome (lock, missing entity, bad input).
    Policy,
    /// Infrastructure failure (storage, IO, serialization).
    System,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Policy => write!(f, "Policy"),
            FailureKind::System => write!(f, "System"),
        }
    }
}

pub type CostResult<T> = Result<T, CostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(CostError::Locked("x".into()).code(), "LOCKED");
        assert_eq!(CostError::not_found("x").code(), "NOT_FOUND");
        assert_eq!(CostError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(CostError::Internal("x".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn failure_kind_split() {
        assert_eq!(CostError::Locked("x".into()).kind(), FailureKind::Policy);
        assert_eq!(CostError::validation("x").kind(), FailureKind::Policy);
        assert_eq!(
            CostError::Store(rusqlite::Error::QueryReturnedNoRows).kind(),
            FailureKind::System
        );
        assert_eq!(FailureKind::System.to_string(), "System");
    }

    #[test]
    fn locked_display() {
        let err = CostError::Locked("cost header is locked".into());
        assert_eq!(err.to_string(), "Locked: cost header is locked");
    }
}
