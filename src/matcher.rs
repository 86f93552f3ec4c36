/*!
The top-level matcher facade.

[`Regex`] wires the whole pipeline (parse, Thompson, subset,
parallelization, table upload) over the built-in
[`CpuDevice`](crate::device::CpuDevice) and exposes the one question this
crate answers: is the entire input in the pattern's language?

## Example
```
use pardfa::Regex;

let re = Regex::new("[A-Za-z_][A-Za-z0-9_]*").unwrap();
assert!(re.try_is_match("test123").unwrap());
assert!(!re.try_is_match("123test").unwrap());
```

For a custom device, drive [`engine::block::Engine`](crate::engine::block::Engine)
directly.
*/

use bon::bon;

use crate::{
    device::{CpuDevice, Device},
    engine::{
        block::{CompiledPattern, Engine},
        MatchError,
    },
    pdfa::{BuildError, ParallelDfa, ParallelizeConfig},
    syntax::parse,
};

/// A compiled whole-string matcher.
///
/// Matching is acceptance-only: no capture groups, no match offsets, and
/// the pattern is implicitly anchored at both ends.
pub struct Regex {
    engine: Engine<CpuDevice>,
    compiled: CompiledPattern<CpuDevice>,
}

impl std::fmt::Debug for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regex")
            .field("device", &self.engine.device().name())
            .field("parallel_states", &self.compiled.pdfa().state_count())
            .finish_non_exhaustive()
    }
}

#[bon]
impl Regex {
    /// Compiles `pattern` with the default limits.
    pub fn new(pattern: &str) -> Result<Self, BuildError> {
        Self::builder().build(pattern)
    }

    /// Builder-style compilation.
    ///
    /// ## Example
    /// ```
    /// use pardfa::{pdfa::BuildError, Regex};
    ///
    /// let re = Regex::builder().build("a(bc)*a").unwrap();
    /// assert!(re.try_is_match("abcbca").unwrap());
    ///
    /// let err = Regex::builder().state_limit(2).build("abc").unwrap_err();
    /// assert!(matches!(err, BuildError::StateLimitReached { limit: 2 }));
    /// ```
    #[builder(builder_type = Builder, finish_fn = build)]
    pub fn builder(
        #[builder(finish_fn)] pattern: &str,

        /// Cap on distinct parallel states, at most
        /// [`ParallelDfa::MAX_STATES`].
        state_limit: Option<usize>,
    ) -> Result<Self, BuildError> {
        let config = match state_limit {
            Some(limit) => ParallelizeConfig::builder().state_limit(limit).build(),
            None => ParallelizeConfig::default(),
        };

        let engine = Engine::new(CpuDevice::new())?;
        let compiled = engine.compile_with(&parse(pattern)?, &config)?;
        Ok(Self { engine, compiled })
    }

    /// Returns whether the entire haystack matches.
    pub fn try_is_match(&self, haystack: impl AsRef<[u8]>) -> Result<bool, MatchError> {
        self.engine.matches(&self.compiled, haystack.as_ref())
    }

    /// The parallel DFA behind this matcher.
    pub fn pdfa(&self) -> &ParallelDfa {
        self.compiled.pdfa()
    }
}
