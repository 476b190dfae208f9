//! Process-wide tracing setup shared by binaries and tests.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Install the global subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
