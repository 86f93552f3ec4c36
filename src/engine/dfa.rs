//! Sequential DFA simulation.

use crate::{
    automata::{subset, thompson, Dfa, StateRef},
    engine::Matcher,
    syntax::Pattern,
};

/// Walks the DFA byte by byte. The O(n) baseline the parallel engines are
/// measured and checked against.
#[derive(Clone, Debug)]
pub struct DfaEngine {
    dfa: Dfa,
}

impl DfaEngine {
    pub fn compile(pattern: &Pattern) -> Self {
        Self::from_dfa(subset::determinize(&thompson::compile(pattern)))
    }

    pub fn from_dfa(dfa: Dfa) -> Self {
        Self { dfa }
    }

    pub fn dfa(&self) -> &Dfa {
        &self.dfa
    }
}

impl Matcher for DfaEngine {
    fn matches(&self, haystack: &[u8]) -> bool {
        let mut state = StateRef::START;
        for &byte in haystack {
            match self.dfa.transition(state, byte) {
                Some(next) => state = next,
                None => return false,
            }
        }
        self.dfa.is_accept(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    #[test]
    fn basic() {
        let engine = DfaEngine::compile(&parse("a*b").unwrap());
        assert!(engine.matches(b"b"));
        assert!(engine.matches(b"aaaab"));
        assert!(!engine.matches(b""));
        assert!(!engine.matches(b"ba"));
        assert!(!engine.matches(b"c"));
    }
}
