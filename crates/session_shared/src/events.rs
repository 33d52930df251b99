//! Completion messages, fan-out payloads and the backend error taxonomy.

use strum::Display;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::ids::SessionName;
use crate::search::SessionSearchResult;

/// The five session operations the orchestrator issues.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Create,
    Find,
    Join,
    Destroy,
    Start,
}

impl OperationKind {
    pub const COUNT: usize = 5;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Create,
        Self::Find,
        Self::Join,
        Self::Destroy,
        Self::Start,
    ];

    pub const fn index(self) -> usize {
        match self {
            Self::Create => 0,
            Self::Find => 1,
            Self::Join => 2,
            Self::Destroy => 3,
            Self::Start => 4,
        }
    }
}

/// Result code of a join attempt, passed through from the backend unmodified.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum JoinResult {
    Success,
    AlreadyInSession,
    SessionIsFull,
    SessionDoesNotExist,
    CouldNotRetrieveAddress,
    UnknownError,
}

impl JoinResult {
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Asynchronous completion a backend pushes into the orchestrator's sink.
///
/// Exactly one completion must follow every synchronously accepted call;
/// none may follow a rejected one.
#[derive(Clone, Debug)]
pub enum BackendCompletion {
    Create {
        name: SessionName,
        success: bool,
    },
    Find {
        results: Vec<SessionSearchResult>,
        success: bool,
    },
    Join {
        name: SessionName,
        result: JoinResult,
        /// Address the external connect mechanism uses after a successful join.
        resolved_address: Option<String>,
    },
    Destroy {
        name: SessionName,
        success: bool,
    },
    Start {
        name: SessionName,
        success: bool,
    },
}

impl BackendCompletion {
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Find { .. } => OperationKind::Find,
            Self::Join { .. } => OperationKind::Join,
            Self::Destroy { .. } => OperationKind::Destroy,
            Self::Start { .. } => OperationKind::Start,
        }
    }
}

/// Channel half a backend uses to deliver completions.
pub type CompletionSender = UnboundedSender<BackendCompletion>;

/// Synchronous dispatch failures a backend may raise. No completion follows
/// any of these.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend rejected the call: {0}")]
    Rejected(String),
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
    #[error("invalid search query: {0}")]
    InvalidQuery(&'static str),
}

/// Terminal outcome of a create operation.
#[derive(Clone, Copy, Debug)]
pub struct CreateComplete {
    pub success: bool,
}

/// Terminal outcome of a find operation. An empty result set is always
/// reported as a failure.
#[derive(Clone, Debug)]
pub struct FindComplete {
    pub results: Vec<SessionSearchResult>,
    pub success: bool,
}

/// Terminal outcome of a join operation, carrying the backend's raw code.
#[derive(Clone, Copy, Debug)]
pub struct JoinComplete {
    pub result: JoinResult,
}

/// Terminal outcome of a destroy operation.
#[derive(Clone, Copy, Debug)]
pub struct DestroyComplete {
    pub success: bool,
}

/// Terminal outcome of a start operation.
#[derive(Clone, Copy, Debug)]
pub struct StartComplete {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::GAME_SESSION;

    #[test]
    fn completion_kind_mapping() {
        let completions = [
            BackendCompletion::Create {
                name: GAME_SESSION,
                success: true,
            },
            BackendCompletion::Find {
                results: Vec::new(),
                success: true,
            },
            BackendCompletion::Join {
                name: GAME_SESSION,
                result: JoinResult::Success,
                resolved_address: None,
            },
            BackendCompletion::Destroy {
                name: GAME_SESSION,
                success: true,
            },
            BackendCompletion::Start {
                name: GAME_SESSION,
                success: true,
            },
        ];
        for (completion, kind) in completions.iter().zip(OperationKind::ALL) {
            assert_eq!(completion.kind(), kind);
        }
    }

    #[test]
    fn only_success_counts_as_success() {
        assert!(JoinResult::Success.is_success());
        assert!(!JoinResult::SessionIsFull.is_success());
        assert!(!JoinResult::UnknownError.is_success());
    }

    #[test]
    fn backend_errors_name_their_cause() {
        assert_eq!(
            BackendError::Rejected("bad config".into()).to_string(),
            "backend rejected the call: bad config"
        );
        assert_eq!(
            BackendError::Unsupported("destroy_session").to_string(),
            "operation not supported by this backend: destroy_session"
        );
        assert_eq!(
            BackendError::InvalidQuery("max_results must be positive").to_string(),
            "invalid search query: max_results must be positive"
        );
    }

    #[test]
    fn operation_kind_indices_are_dense() {
        for (position, kind) in OperationKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }
}
