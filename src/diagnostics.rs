//! Non-fatal diagnostics emitted by selector calls.

use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

/// A recoverable usage problem detected during a selector call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Warning {
    /// The deriver returned something that is not a non-empty set of
    /// dependents. The call returned `None` without touching the cache.
    InvalidDependents,
    /// An argument was a sequence or a map. The call proceeded, but its
    /// signature is likely to collide with unrelated calls.
    ComplexArguments,
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad(match self {
            Self::InvalidDependents => "getDependents must return an object",
            Self::ComplexArguments => {
                "do not pass complex objects as arguments to a memoized selector"
            }
        })
    }
}

/// Receives warnings from selector calls.
pub type Sink = Rc<dyn Fn(&Warning)>;

/// The default sink: a `tracing` event at warn level.
///
/// Without a subscriber installed by the host, the event is discarded.
pub fn log(warning: &Warning) {
    tracing::warn!(target: "memoselect", kind = ?warning, "{warning}");
}

/// A sink that writes straight to the standard error stream.
pub fn stderr(warning: &Warning) {
    eprintln!("memoselect: warning: {warning}");
}

/// A sink that drops every warning.
pub fn ignore(_: &Warning) {}

pub(crate) fn default_sink() -> Sink {
    Rc::new(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Warning::InvalidDependents.to_string(), "getDependents must return an object");
        assert!(Warning::ComplexArguments.to_string().starts_with("do not pass complex objects"));
    }
}
