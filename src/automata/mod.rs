/*!
Finite automata shared by the compilation pipeline.

NFA and DFA use one storage shape, parameterized by the symbol type:
[`Nfa`] uses `Option<u8>` (`None` is an ε-transition) and [`Dfa`] uses
`u8`. States are `(first, num, accept)` records over a single transition
array; all transitions of a state form one contiguous, symbol-sorted run,
with ε first for the NFA. All state references are indices into the state
array, and the start state is always index 0.
*/

use std::fmt::Debug;

use itertools::Itertools;

pub mod matrix;
pub mod subset;
pub mod thompson;

/// Index of a state in an [`Automaton`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateRef(pub(crate) u32);

impl StateRef {
    /// The start state of every automaton.
    pub const START: StateRef = StateRef(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct State {
    first: u32,
    num: u32,
    accept: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Transition<S> {
    pub dst: StateRef,
    pub symbol: S,
}

/// An ε-NFA over bytes. `symbol == None` is an ε-transition, sorted before
/// all byte transitions of the same state.
pub type Nfa = Automaton<Option<u8>>;

/// A byte DFA. Missing transitions are implicit rejection; per state and
/// byte there is at most one transition.
pub type Dfa = Automaton<u8>;

/// Indexed automaton storage shared by [`Nfa`] and [`Dfa`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Automaton<S> {
    states: Vec<State>,
    transitions: Vec<Transition<S>>,
}

impl<S: Copy + Ord> Automaton<S> {
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn is_accept(&self, state: StateRef) -> bool {
        self.states[state.index()].accept
    }

    /// All outgoing transitions of `state`, sorted by symbol.
    pub fn transitions(&self, state: StateRef) -> &[Transition<S>] {
        let state = &self.states[state.index()];
        &self.transitions[state.first as usize..(state.first + state.num) as usize]
    }

    pub fn states(&self) -> impl Iterator<Item = StateRef> {
        (0..self.states.len() as u32).map(StateRef)
    }
}

impl Dfa {
    /// Looks up the unique `byte` transition of `state`, if present.
    pub fn transition(&self, state: StateRef, byte: u8) -> Option<StateRef> {
        let transitions = self.transitions(state);
        transitions
            .binary_search_by_key(&byte, |t| t.symbol)
            .ok()
            .map(|i| transitions[i].dst)
    }
}

/// Collects typed edges in any order, then [`build`](Builder::build)s the
/// indexed automaton: transitions are sorted by `(source, symbol)` and
/// grouped into per-state runs.
#[derive(Debug)]
pub struct Builder<S> {
    accept: Vec<bool>,
    edges: Vec<(StateRef, Transition<S>)>,
}

impl<S: Copy + Ord + Debug> Builder<S> {
    pub fn new() -> Self {
        Self {
            accept: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn new_state(&mut self) -> StateRef {
        let state = StateRef(self.accept.len() as u32);
        self.accept.push(false);
        state
    }

    pub fn state_count(&self) -> usize {
        self.accept.len()
    }

    pub fn mark_accept(&mut self, state: StateRef) {
        self.accept[state.index()] = true;
    }

    pub fn add(&mut self, src: StateRef, symbol: S, dst: StateRef) {
        debug_assert!(src.index() < self.accept.len());
        debug_assert!(dst.index() < self.accept.len());
        self.edges.push((src, Transition { dst, symbol }));
    }

    pub fn build(mut self) -> Automaton<S> {
        self.edges
            .sort_by_key(|&(src, transition)| (src, transition.symbol));

        let mut states = Vec::with_capacity(self.accept.len());
        let mut transitions = Vec::with_capacity(self.edges.len());
        let mut edges = self.edges.into_iter().peekable();
        for (index, accept) in self.accept.into_iter().enumerate() {
            let first = transitions.len() as u32;
            let run = edges.peeking_take_while(|&(src, _)| src.index() == index);
            transitions.extend(run.map(|(_, transition)| transition));
            states.push(State {
                first,
                num: transitions.len() as u32 - first,
                accept,
            });
        }
        debug_assert!(edges.next().is_none());

        Automaton {
            states,
            transitions,
        }
    }
}

impl<S: Copy + Ord + Debug> Default for Builder<S> {
    fn default() -> Self {
        Self::new()
    }
}
