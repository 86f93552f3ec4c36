//! Subset construction: ε-NFA → DFA.
//!
//! Each DFA state stands for a set of NFA states, stored as a bitset and
//! interned by content so equal subsets share one DFA state. The worklist
//! processes subsets in discovery order, exactly one DFA transition per
//! `(subset, byte)` pair; bytes without a transition reject implicitly.

use std::collections::HashMap;

use crate::automata::{Dfa, Nfa, StateRef, Builder};

/// Determinizes `nfa`. The DFA start state is the ε-closure of NFA state 0;
/// a DFA state accepts iff its subset contains an accepting NFA state.
pub fn determinize(nfa: &Nfa) -> Dfa {
    let words = nfa.state_count().div_ceil(64);

    let mut store = SubsetStore::default();
    let mut builder: Builder<u8> = Builder::new();

    let mut start = StateSet::empty(words);
    start.insert(StateRef::START);
    closure(nfa, &mut start);
    let (start_ref, _) = store.intern(start.clone());
    let new_state = builder.new_state();
    debug_assert_eq!(new_state, start_ref);
    if start.intersects_accept(nfa) {
        builder.mark_accept(start_ref);
    }

    let mut i = 0;
    while i < store.sets.len() {
        let subset = store.sets[i].clone();
        for byte in follow(nfa, &subset) {
            let mut target = step(nfa, &subset, byte);
            closure(nfa, &mut target);
            let accept = target.intersects_accept(nfa);
            let (target_ref, is_new) = store.intern(target);
            if is_new {
                let state = builder.new_state();
                debug_assert_eq!(state, target_ref);
                if accept {
                    builder.mark_accept(target_ref);
                }
            }
            builder.add(StateRef(i as u32), byte, target_ref);
        }
        i += 1;
    }

    let dfa = builder.build();
    tracing::debug!(
        nfa_states = nfa.state_count(),
        dfa_states = dfa.state_count(),
        "subset construction done"
    );
    dfa
}

/// A set of NFA states as a fixed-width bitset.
#[derive(Clone, PartialEq, Eq, Hash)]
struct StateSet {
    words: Box<[u64]>,
}

impl StateSet {
    fn empty(words: usize) -> Self {
        Self {
            words: vec![0; words].into_boxed_slice(),
        }
    }

    /// Returns whether the state was newly added.
    fn insert(&mut self, state: StateRef) -> bool {
        let word = &mut self.words[state.index() / 64];
        let bit = 1 << (state.index() % 64);
        let added = *word & bit == 0;
        *word |= bit;
        added
    }

    fn iter(&self) -> impl Iterator<Item = StateRef> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut word = word;
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let bit = word.trailing_zeros();
                word &= word - 1;
                Some(StateRef(i as u32 * 64 + bit))
            })
        })
    }

    fn intersects_accept(&self, nfa: &Nfa) -> bool {
        self.iter().any(|state| nfa.is_accept(state))
    }
}

/// Content-addressed subset storage; equal bitsets share one DFA state.
#[derive(Default)]
struct SubsetStore {
    refs: HashMap<StateSet, StateRef>,
    sets: Vec<StateSet>,
}

impl SubsetStore {
    fn intern(&mut self, set: StateSet) -> (StateRef, bool) {
        if let Some(&existing) = self.refs.get(&set) {
            return (existing, false);
        }
        let state = StateRef(self.sets.len() as u32);
        self.refs.insert(set.clone(), state);
        self.sets.push(set);
        (state, true)
    }
}

/// Extends `set` with everything reachable over ε-transitions.
fn closure(nfa: &Nfa, set: &mut StateSet) {
    let mut stack: Vec<StateRef> = set.iter().collect();
    while let Some(state) = stack.pop() {
        for transition in nfa.transitions(state) {
            // ε sorts first within a state's run.
            if transition.symbol.is_some() {
                break;
            }
            if set.insert(transition.dst) {
                stack.push(transition.dst);
            }
        }
    }
}

/// The bytes labelling any non-ε transition out of `set`, ascending.
fn follow(nfa: &Nfa, set: &StateSet) -> impl Iterator<Item = u8> {
    let mut bytes = [0u64; 4];
    for state in set.iter() {
        for transition in nfa.transitions(state) {
            if let Some(byte) = transition.symbol {
                bytes[byte as usize / 64] |= 1 << (byte % 64);
            }
        }
    }
    (0u16..=255)
        .map(|b| b as u8)
        .filter(move |&b| bytes[b as usize / 64] & (1 << (b % 64)) != 0)
}

/// All NFA destinations reached from `set` over a `byte` transition.
fn step(nfa: &Nfa, set: &StateSet, byte: u8) -> StateSet {
    let mut target = StateSet::empty(set.words.len());
    for state in set.iter() {
        let transitions = nfa.transitions(state);
        // Transitions are sorted with ε first, so the `byte` run can be
        // found by binary search.
        let from = transitions.partition_point(|t| t.symbol < Some(byte));
        for transition in &transitions[from..] {
            if transition.symbol != Some(byte) {
                break;
            }
            target.insert(transition.dst);
        }
    }
    target
}
