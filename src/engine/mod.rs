/*!
Matching engines.

Four engines decide the same whole-string acceptance question:

- [`dfa::DfaEngine`] walks the DFA byte by byte.
- [`nfa::NfaEngine`] simulates the ε-NFA state set directly, without any of
  the later pipeline stages; it exists as the independent reference the
  others are checked against.
- [`serial::SerialEngine`] folds the parallel DFA left to right on the
  host, exercising the associative encoding without a device.
- [`block::Engine`] performs the block-parallel reduction on a
  [`Device`](crate::device::Device).

All of them agree on every `(pattern, input)` pair; the randomized tests in
this module hold them to that.
*/

use crate::device::DeviceError;

pub mod block;
pub mod dfa;
pub mod nfa;
pub mod serial;

/// An error surfaced while matching.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum MatchError {
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// The acceptance contract shared by the infallible host engines: does the
/// whole input belong to the pattern's language?
pub trait Matcher {
    fn matches(&self, haystack: &[u8]) -> bool;
}
