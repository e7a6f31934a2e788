use crate::Error;
use mongodb::error::{ErrorKind, RETRYABLE_WRITE_ERROR};

/// Errors that may go away when the same operation is attempted again, such
/// as losing the primary of a replica set until a new one is elected.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for mongodb::error::Error {
    fn is_transient(&self) -> bool {
        match self.kind.as_ref() {
            ErrorKind::Io(_)
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::ConnectionPoolCleared { .. } => true,
            _ => self.contains_label(RETRYABLE_WRITE_ERROR),
        }
    }
}

impl Transient for Error {
    fn is_transient(&self) -> bool {
        match self {
            Self::Driver(e) => e.is_transient(),
            Self::NotConnected { .. } => true,
            _ => false,
        }
    }
}

/// Runs `op`, and runs it exactly once more if the first attempt failed with
/// a [`Transient`] error. The second outcome is returned as is.
///
/// Only use this for single database operations: MongoDB has no
/// transactions here, so steps of a multi-operation closure that succeeded
/// before the failure would be executed again.
///
/// ```
/// use devkit_mongo::{Transient, autoretry};
///
/// #[derive(Debug)]
/// struct Failover;
///
/// impl Transient for Failover {
///     fn is_transient(&self) -> bool {
///         true
///     }
/// }
///
/// let mut attempts = 0;
/// let result = autoretry(|| {
///     attempts += 1;
///     if attempts == 1 { Err(Failover) } else { Ok(attempts) }
/// });
/// assert_eq!(result.unwrap(), 2);
/// ```
pub fn autoretry<T, E, F>(mut op: F) -> Result<T, E>
where
    E: Transient,
    F: FnMut() -> Result<T, E>,
{
    match op() {
        Err(e) if e.is_transient() => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Transient failure, retrying once");
            drop(e);
            op()
        }
        outcome => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NameKind;

    #[derive(Debug, PartialEq)]
    enum FakeError {
        Failover,
        Rejected,
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, Self::Failover)
        }
    }

    #[test]
    fn success_runs_once() {
        let mut calls = 0;
        let result: Result<_, FakeError> = autoretry(|| {
            calls += 1;
            Ok("done")
        });
        assert_eq!(result, Ok("done"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn transient_failure_is_retried_once() {
        let mut calls = 0;
        let result = autoretry(|| {
            calls += 1;
            if calls == 1 {
                Err(FakeError::Failover)
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(2));
        assert_eq!(calls, 2);
    }

    #[test]
    fn second_transient_failure_is_returned() {
        let mut calls = 0;
        let result: Result<(), _> = autoretry(|| {
            calls += 1;
            Err(FakeError::Failover)
        });
        assert_eq!(result, Err(FakeError::Failover));
        assert_eq!(calls, 2);
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = autoretry(|| {
            calls += 1;
            Err(FakeError::Rejected)
        });
        assert_eq!(result, Err(FakeError::Rejected));
        assert_eq!(calls, 1);
    }

    #[test]
    fn local_errors_are_permanent() {
        let err = Error::InvalidName {
            kind: NameKind::Database,
            name: String::new(),
            reason: "must not be empty",
        };
        assert!(!err.is_transient());
        assert!(
            !Error::NotADocument {
                found: "Null".into()
            }
            .is_transient()
        );
    }
}
