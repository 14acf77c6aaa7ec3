//! What happens when a result handle is discarded without being inspected

use std::thread;

use log::{debug, error};
use proc_core::{ProcError, Result};

/// Reaction to an unsuccessful exit found at disposal time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkPolicy {
    /// Raise the `UnsuccessfulExit` error at the point of discard
    #[default]
    Panic,
    /// Log the error and continue
    Log,
    /// Drop the error silently
    Ignore,
}

/// Apply `policy` to the outcome of an implicit disposal.
///
/// With `Panic` the error itself is the panic payload, so callers that catch
/// the unwind can downcast it back to [`ProcError`].
pub(crate) fn on_discard(policy: SinkPolicy, outcome: Result<()>) {
    let Err(err) = outcome else {
        return;
    };

    match policy {
        SinkPolicy::Panic if !thread::panicking() => std::panic::panic_any(err),
        SinkPolicy::Panic | SinkPolicy::Log => error!("{}", err),
        SinkPolicy::Ignore => debug!("Ignoring on discard: {}", err),
    }
}

/// Payload of a panic raised by [`SinkPolicy::Panic`], if it is one
pub fn unsuccessful_exit(payload: &(dyn std::any::Any + Send)) -> Option<&ProcError> {
    payload
        .downcast_ref::<ProcError>()
        .filter(|err| err.is_unsuccessful_exit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    fn failure() -> Result<()> {
        Err(ProcError::UnsuccessfulExit {
            exit_code: 2,
            signal: None,
            command: vec!["false".to_string()],
        })
    }

    #[test]
    fn default_policy_panics() {
        assert_eq!(SinkPolicy::default(), SinkPolicy::Panic);
    }

    #[test]
    fn panic_policy_raises_the_error() {
        let payload = panic::catch_unwind(|| on_discard(SinkPolicy::Panic, failure())).unwrap_err();
        let err = unsuccessful_exit(payload.as_ref()).expect("payload should be the exit error");
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn log_and_ignore_policies_return() {
        on_discard(SinkPolicy::Log, failure());
        on_discard(SinkPolicy::Ignore, failure());
    }

    #[test]
    fn success_is_silent_for_every_policy() {
        for policy in [SinkPolicy::Panic, SinkPolicy::Log, SinkPolicy::Ignore] {
            on_discard(policy, Ok(()));
        }
    }

    #[test]
    fn unrelated_payloads_are_not_exit_errors() {
        let payload = panic::catch_unwind(|| panic!("plain")).unwrap_err();
        assert!(unsuccessful_exit(payload.as_ref()).is_none());
    }
}
