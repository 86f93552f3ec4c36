//! Serial PDFA reduction.
//!
//! Folds the per-byte parallel states left to right with `merge` on the
//! host. Same associative encoding as the device path, none of the device
//! plumbing; the correctness reference for the parallel tables themselves.

use crate::{
    automata::{subset, thompson},
    engine::Matcher,
    pdfa::{self, BuildError, ParallelDfa},
    syntax::Pattern,
};

#[derive(Clone, Debug)]
pub struct SerialEngine {
    pdfa: ParallelDfa,
}

impl SerialEngine {
    pub fn compile(pattern: &Pattern) -> Result<Self, BuildError> {
        let dfa = subset::determinize(&thompson::compile(pattern));
        Ok(Self {
            pdfa: pdfa::parallelize(&dfa)?,
        })
    }

    pub fn from_pdfa(pdfa: ParallelDfa) -> Self {
        Self { pdfa }
    }
}

impl Matcher for SerialEngine {
    fn matches(&self, haystack: &[u8]) -> bool {
        let Some((&first, rest)) = haystack.split_first() else {
            return self.pdfa.empty_is_accepting();
        };
        let mut acc = self.pdfa.initial(first);
        for &byte in rest {
            if acc.is_reject() {
                break;
            }
            acc = self.pdfa.merge(acc, self.pdfa.initial(byte));
        }
        self.pdfa.is_accepting(acc)
    }
}
