/*!
Parallelization of a DFA into a parallel DFA (PDFA).

A DFA consumes input strictly left to right. Lifting each byte `b` to the
*function* `f_b(q) = δ(q, b)` over DFA states (with a distinguished reject)
makes matching a composition problem, and composition is associative, so a
balanced reduction tree can evaluate `f_{w₁} ∘ … ∘ f_{wₙ}` in logarithmic
depth. A PDFA state *is* such a function; [`parallelize`] enumerates every
function reachable by composing the 256 per-byte functions and closes the
binary `merge` operation (composition) into a lookup table.

The per-state functions are stored as byte vectors indexed by DFA state,
with [`ParaRef::REJECT`] (`0xFF`) as the reject entry, and interned by
content, so two PDFA states are equal exactly when they denote the same
function. The same `0xFF` convention is the kernel ABI: the device sees
`initial_states` and the flattened merge table as plain bytes.
*/

use std::collections::HashMap;

use crate::{
    automata::{matrix::Matrix, Dfa, StateRef},
    device::{DeviceError, REJECT_BYTE},
    syntax::ParseError,
};

/// An error returned when a pattern cannot be compiled.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The DFA has more states than the 8-bit function encoding can index.
    #[error("DFA has {count} states, more than the {max} the parallel encoding supports", max = ParallelDfa::MAX_STATES)]
    TooManyStates { count: usize },
    /// Parallelization hit the configured state cap.
    #[error("parallel state limit of {limit} reached")]
    StateLimitReached { limit: usize },
    /// The merge table outgrew the device shared-memory budget.
    #[error("merge table for {states} parallel states exceeds the {budget}-byte table budget", budget = ParallelDfa::TABLE_BUDGET)]
    MergeTableOverflow { states: usize },
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Reference to a parallel state, with a reserved value for the absorbing
/// reject state. The in-memory representation is the kernel ABI byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ParaRef(u8);

impl ParaRef {
    /// The absorbing reject state: merging it with anything, from either
    /// side, yields it again.
    pub const REJECT: ParaRef = ParaRef(REJECT_BYTE);

    pub fn from_index(index: usize) -> Self {
        debug_assert!(index < ParallelDfa::MAX_STATES);
        Self(index as u8)
    }

    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub fn to_byte(self) -> u8 {
        self.0
    }

    pub fn is_reject(self) -> bool {
        self.0 == REJECT_BYTE
    }

    /// Index into the parallel state tables. Not meaningful for
    /// [`REJECT`](Self::REJECT).
    pub fn index(self) -> usize {
        debug_assert!(!self.is_reject());
        self.0 as usize
    }
}

impl std::fmt::Debug for ParaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_reject() {
            f.write_str("ParaRef(REJECT)")
        } else {
            write!(f, "ParaRef({})", self.0)
        }
    }
}

/// A parallel DFA: the associative form of a DFA.
///
/// `initial[b]` is the parallel state for consuming exactly the byte `b`,
/// `merge` closes composition over all reachable states, and `accepting`
/// records whether a state, applied to the DFA start state, lands on an
/// accepting DFA state. The whole-string decision for input `w₁…wₙ` is
/// `accepting[initial[w₁] ⊕ … ⊕ initial[wₙ]]` where `⊕` is `merge`;
/// the empty input is decided by `empty_is_accepting` alone.
#[derive(Clone, Debug)]
pub struct ParallelDfa {
    initial: [ParaRef; 256],
    merge: Matrix<ParaRef>,
    accepting: Vec<bool>,
    empty_is_accepting: bool,
}

impl ParallelDfa {
    /// Hard cap on parallel states: one byte indexes a state, and `0xFF` is
    /// reserved for reject.
    pub const MAX_STATES: usize = 255;

    /// Device shared-memory budget for `initial` plus the merge table:
    /// `n² + 256` bytes must fit.
    pub const TABLE_BUDGET: usize = 32768;

    pub fn state_count(&self) -> usize {
        self.accepting.len()
    }

    /// The parallel state for consuming exactly `byte`.
    pub fn initial(&self, byte: u8) -> ParaRef {
        self.initial[byte as usize]
    }

    /// Composition: apply `a`, then `b`. Reject absorbs from either side.
    pub fn merge(&self, a: ParaRef, b: ParaRef) -> ParaRef {
        if a.is_reject() || b.is_reject() {
            ParaRef::REJECT
        } else {
            self.merge[(a.index(), b.index())]
        }
    }

    /// Whether `state` applied to the DFA start state accepts. Reject never
    /// does.
    pub fn is_accepting(&self, state: ParaRef) -> bool {
        !state.is_reject() && self.accepting[state.index()]
    }

    /// Whether the empty input is in the language.
    pub fn empty_is_accepting(&self) -> bool {
        self.empty_is_accepting
    }

    /// The `initial` table in kernel ABI form.
    pub fn initial_bytes(&self) -> [u8; 256] {
        let mut bytes = [REJECT_BYTE; 256];
        for (byte, &state) in bytes.iter_mut().zip(self.initial.iter()) {
            *byte = state.to_byte();
        }
        bytes
    }

    /// The merge table in kernel ABI form: row-major `n × n` bytes.
    pub fn merge_bytes(&self) -> Vec<u8> {
        self.merge.cells().iter().map(|c| c.to_byte()).collect()
    }
}

/// Parallelization limits.
#[derive(Clone, Debug, bon::Builder)]
pub struct ParallelizeConfig {
    /// Cap on distinct parallel states; construction aborts with
    /// [`BuildError::StateLimitReached`] beyond it. Clamped to
    /// [`ParallelDfa::MAX_STATES`] by the 8-bit kernel state encoding.
    #[builder(default = ParallelDfa::MAX_STATES)]
    pub state_limit: usize,
}

impl Default for ParallelizeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parallelizes `dfa` under the default limits.
pub fn parallelize(dfa: &Dfa) -> Result<ParallelDfa, BuildError> {
    parallelize_with(dfa, &ParallelizeConfig::default())
}

/// Parallelizes `dfa`: interns the 256 per-byte functions, then sweeps the
/// composition of every ordered pair until no new function appears, growing
/// the merge table alongside.
pub fn parallelize_with(dfa: &Dfa, config: &ParallelizeConfig) -> Result<ParallelDfa, BuildError> {
    if dfa.state_count() > ParallelDfa::MAX_STATES {
        return Err(BuildError::TooManyStates {
            count: dfa.state_count(),
        });
    }
    let limit = config.state_limit.min(ParallelDfa::MAX_STATES);

    let mut store = FnStore::new(limit);
    let mut merge = Matrix::new();

    // The 256 per-byte functions. A byte no DFA state can consume maps to
    // the shared reject sentinel instead of occupying a state.
    let mut initial = [ParaRef::REJECT; 256];
    for byte in 0u8..=255 {
        let mut f = vec![REJECT_BYTE; dfa.state_count()];
        let mut live = false;
        for state in dfa.states() {
            if let Some(dst) = dfa.transition(state, byte) {
                f[state.index()] = dst.0 as u8;
                live = true;
            }
        }
        if live {
            initial[byte as usize] = store.intern(f.into_boxed_slice())?;
        }
    }

    // Close `merge` under composition. A sweep computes both orders of
    // every pair; interning can append states mid-sweep, which extends the
    // loop bounds, and the construction is done once a whole sweep interns
    // nothing new.
    merge.grow_to(store.len(), ParaRef::REJECT);
    loop {
        let before = store.len();
        let mut i = 0;
        while i < store.len() {
            let mut j = 0;
            while j < store.len() {
                for (row, col) in [(i, j), (j, i)] {
                    let composed = compose(&store.fns[row], &store.fns[col]);
                    // A composition that rejects everywhere is the sentinel,
                    // not a state of its own.
                    let state = if composed.iter().all(|&s| s == REJECT_BYTE) {
                        ParaRef::REJECT
                    } else {
                        store.intern(composed)?
                    };
                    merge.grow_to(store.len(), ParaRef::REJECT);
                    merge[(row, col)] = state;
                }
                j += 1;
            }
            i += 1;
        }
        if store.len() == before {
            break;
        }
    }
    merge.pack();

    let accepting: Vec<bool> = store
        .fns
        .iter()
        .map(|f| {
            let dst = f[StateRef::START.index()];
            dst != REJECT_BYTE && dfa.is_accept(StateRef(dst as u32))
        })
        .collect();

    tracing::debug!(
        dfa_states = dfa.state_count(),
        parallel_states = store.len(),
        table_bytes = store.len() * store.len() + 256,
        "parallelization done"
    );

    Ok(ParallelDfa {
        initial,
        merge,
        accepting,
        empty_is_accepting: dfa.is_accept(StateRef::START),
    })
}

/// `r(s) = q(p(s))`: apply `p`, then `q`, rejecting as soon as `p` does.
fn compose(p: &[u8], q: &[u8]) -> Box<[u8]> {
    p.iter()
        .map(|&s| {
            if s == REJECT_BYTE {
                REJECT_BYTE
            } else {
                q[s as usize]
            }
        })
        .collect()
}

/// Content-addressed function storage: a hash over the function vector maps
/// to a small ref, and equal vectors share one parallel state.
struct FnStore {
    refs: HashMap<Box<[u8]>, ParaRef>,
    fns: Vec<Box<[u8]>>,
    limit: usize,
}

impl FnStore {
    fn new(limit: usize) -> Self {
        Self {
            refs: HashMap::new(),
            fns: Vec::new(),
            limit,
        }
    }

    fn len(&self) -> usize {
        self.fns.len()
    }

    fn intern(&mut self, f: Box<[u8]>) -> Result<ParaRef, BuildError> {
        if let Some(&existing) = self.refs.get(&f) {
            return Ok(existing);
        }
        if self.fns.len() >= self.limit {
            return Err(BuildError::StateLimitReached { limit: self.limit });
        }
        let states = self.fns.len() + 1;
        if states * states + 256 > ParallelDfa::TABLE_BUDGET {
            return Err(BuildError::MergeTableOverflow { states });
        }
        let state = ParaRef::from_index(self.fns.len());
        self.refs.insert(f.clone(), state);
        self.fns.push(f);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        automata::{subset, thompson},
        syntax::parse,
    };

    fn compile(pattern: &str) -> (Dfa, ParallelDfa) {
        let dfa = subset::determinize(&thompson::compile(&parse(pattern).unwrap()));
        let pdfa = parallelize(&dfa).unwrap();
        (dfa, pdfa)
    }

    fn all_states(pdfa: &ParallelDfa) -> Vec<ParaRef> {
        let mut states: Vec<ParaRef> = (0..pdfa.state_count()).map(ParaRef::from_index).collect();
        states.push(ParaRef::REJECT);
        states
    }

    #[test]
    fn merge_is_associative() {
        for pattern in ["a*b", "abc|def", "[ab]c*", "a(bc)*a", ".?."] {
            let (_, pdfa) = compile(pattern);
            let states = all_states(&pdfa);
            for &a in &states {
                for &b in &states {
                    for &c in &states {
                        assert_eq!(
                            pdfa.merge(pdfa.merge(a, b), c),
                            pdfa.merge(a, pdfa.merge(b, c)),
                            "{pattern:?}: ({a:?} {b:?} {c:?})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn reject_absorbs_both_sides() {
        let (_, pdfa) = compile("a*b");
        for &state in &all_states(&pdfa) {
            assert!(pdfa.merge(ParaRef::REJECT, state).is_reject());
            assert!(pdfa.merge(state, ParaRef::REJECT).is_reject());
        }
    }

    #[test]
    fn merge_table_is_closed() {
        for pattern in ["a*b", "abc|def", "a[^b-l]c"] {
            let (_, pdfa) = compile(pattern);
            let n = pdfa.state_count();
            for &a in &all_states(&pdfa) {
                for &b in &all_states(&pdfa) {
                    let merged = pdfa.merge(a, b);
                    assert!(merged.is_reject() || merged.index() < n);
                }
            }
            for byte in 0u8..=255 {
                let state = pdfa.initial(byte);
                assert!(state.is_reject() || state.index() < n);
            }
        }
    }

    #[test]
    fn empty_acceptance_mirrors_dfa_start() {
        for (pattern, expected) in [("", true), ("a*", true), ("a|", true), ("abc", false)] {
            let (dfa, pdfa) = compile(pattern);
            assert_eq!(pdfa.empty_is_accepting(), expected, "{pattern:?}");
            assert_eq!(
                pdfa.empty_is_accepting(),
                dfa.is_accept(StateRef::START),
                "{pattern:?}"
            );
        }
    }

    #[test]
    fn agrees_with_dfa_walk() {
        let inputs: &[&[u8]] = &[
            b"", b"a", b"b", b"ab", b"aab", b"ba", b"abc", b"def", b"abcdef", b"aaaab", b"c",
            b"\n", b"a\nb",
        ];
        for pattern in ["a*b", "abc|def", "a(bc)*a", ".*", "a.c"] {
            let (dfa, pdfa) = compile(pattern);
            for &input in inputs {
                let dfa_accepts = {
                    let mut state = Some(StateRef::START);
                    for &byte in input {
                        state = state.and_then(|s| dfa.transition(s, byte));
                    }
                    state.is_some_and(|s| dfa.is_accept(s))
                };
                let pdfa_accepts = match input {
                    [] => pdfa.empty_is_accepting(),
                    [first, rest @ ..] => {
                        let mut acc = pdfa.initial(*first);
                        for &byte in rest {
                            acc = pdfa.merge(acc, pdfa.initial(byte));
                        }
                        pdfa.is_accepting(acc)
                    }
                };
                assert_eq!(dfa_accepts, pdfa_accepts, "{pattern:?} on {input:?}");
            }
        }
    }

    #[test]
    fn dot_star_is_a_single_identity_state() {
        let (_, pdfa) = compile(".*");
        assert_eq!(pdfa.state_count(), 1);
        let state = ParaRef::from_index(0);
        assert_eq!(pdfa.merge(state, state), state);
        assert!(pdfa.is_accepting(state));
        assert!(pdfa.empty_is_accepting());
        assert!(pdfa.initial(b'\n').is_reject());
        assert_eq!(pdfa.initial(b'x'), state);
    }

    #[test]
    fn state_limit_is_enforced() {
        let dfa = subset::determinize(&thompson::compile(&parse("abc").unwrap()));
        let config = ParallelizeConfig::builder().state_limit(2).build();
        assert!(matches!(
            parallelize_with(&dfa, &config),
            Err(BuildError::StateLimitReached { limit: 2 })
        ));
    }

    #[test]
    fn dfa_too_large_for_byte_encoding() {
        let dfa = subset::determinize(&thompson::compile(&parse("a".repeat(300)).unwrap()));
        assert!(matches!(
            parallelize(&dfa),
            Err(BuildError::TooManyStates { count: 301 })
        ));
    }

    #[test]
    fn merge_table_budget_is_enforced() {
        // 200 shift functions fit the 255-state cap but not the 32 KiB
        // table.
        let dfa = subset::determinize(&thompson::compile(&parse("a".repeat(200)).unwrap()));
        assert!(matches!(
            parallelize(&dfa),
            Err(BuildError::MergeTableOverflow { .. })
        ));
    }
}
