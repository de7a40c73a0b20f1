use dog_queue::QueueError;
use thiserror::Error;

pub type RqResult<T> = Result<T, RqError>;

/// Broad class of an [`RqError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised at registration; aborts app startup
    Configuration,
    /// No usable ambient app at call time
    Context,
    /// A named queue or connection does not exist
    Lookup,
    /// The broker or worker engine failed
    Broker,
}

#[derive(Error, Debug, Clone)]
pub enum RqError {
    #[error("'rq.queue_connections[\"{target}\"]' must be defined for 'rq.queue_connections[\"{name}\"]' to reference it.")]
    UnresolvedReference { name: String, target: String },

    #[error("connection references form a cycle: {}", chain.join(" -> "))]
    ReferenceCycle { chain: Vec<String> },

    #[error("invalid value for 'rq.{key}': {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("An RQ extension is already initialized on this application. Use that instead.")]
    AlreadyRegistered,

    #[error("No applications are registered with this RQ extension.")]
    NoApplications,

    #[error("Working outside of application context. This must be used in a job, a CLI command, or an app context.")]
    OutsideContext,

    #[error("The current application is not registered with this RQ extension.")]
    NotRegistered,

    #[error("The current app is not registered with the RQ extension. Call 'init_app' first.")]
    ExtensionMissing,

    #[error("No queue named '{0}'")]
    QueueNotFound(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl RqError {
    pub fn invalid_config(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnresolvedReference { .. }
            | Self::ReferenceCycle { .. }
            | Self::InvalidConfig { .. }
            | Self::AlreadyRegistered
            | Self::Queue(QueueError::InvalidConnection(_)) => ErrorKind::Configuration,
            Self::NoApplications | Self::OutsideContext | Self::NotRegistered | Self::ExtensionMissing => {
                ErrorKind::Context
            }
            Self::QueueNotFound(_) => ErrorKind::Lookup,
            Self::Queue(_) => ErrorKind::Broker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_reference_names_both_sides() {
        let err = RqError::UnresolvedReference {
            name: "share".into(),
            target: "missing".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("[\"missing\"] must be defined"));
        assert!(msg.contains("[\"share\"] to reference it"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn kinds() {
        assert_eq!(RqError::OutsideContext.kind(), ErrorKind::Context);
        assert_eq!(RqError::QueueNotFound("x".into()).kind(), ErrorKind::Lookup);
        assert_eq!(RqError::from(QueueError::Broker("down".into())).kind(), ErrorKind::Broker);
        assert_eq!(
            RqError::from(QueueError::InvalidConnection("bad".into())).kind(),
            ErrorKind::Configuration
        );
    }
}
