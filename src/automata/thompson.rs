//! Thompson construction: pattern tree → ε-NFA.
//!
//! Every construct compiles to a fragment with one entry state and one exit
//! state, wired together with ε-transitions. The start state of the whole
//! automaton is state 0 and exactly one state is marked accepting.

use crate::{
    automata::{Builder, Nfa, StateRef},
    syntax::{Node, NodeRef, Pattern, RepeatKind},
};

/// A compiled sub-automaton: enter at `start`, leave at `accept`.
#[derive(Clone, Copy)]
struct Fragment {
    start: StateRef,
    accept: StateRef,
}

/// Compiles a pattern into an ε-NFA accepting the same language.
pub fn compile(pattern: &Pattern) -> Nfa {
    let mut compiler = Compiler {
        pattern,
        builder: Builder::new(),
    };
    let fragment = compiler.compile_node(NodeRef::ROOT);
    compiler.builder.mark_accept(fragment.accept);
    debug_assert_eq!(fragment.start, StateRef::START);
    let nfa = compiler.builder.build();
    tracing::debug!(states = nfa.state_count(), "thompson construction done");
    nfa
}

struct Compiler<'p> {
    pattern: &'p Pattern,
    builder: Builder<Option<u8>>,
}

impl Compiler<'_> {
    /// Compiles one node. The fragment's `start` is always the first state
    /// allocated here, which pins the root fragment's start to state 0.
    fn compile_node(&mut self, node: NodeRef) -> Fragment {
        match *self.pattern.node(node) {
            Node::Empty => {
                let state = self.builder.new_state();
                Fragment {
                    start: state,
                    accept: state,
                }
            }
            Node::Char(byte) => self.compile_bytes([byte]),
            Node::AnyNotNl => self.compile_bytes((0u8..=255).filter(|&b| b != b'\n')),
            Node::CharSet(set) => {
                let set = self.pattern.set(set).clone();
                self.compile_bytes(set.bytes())
            }
            Node::Sequence { first, count } => {
                let children: Vec<NodeRef> = self.pattern.children(first, count).collect();
                // Parsing collapses empty sequences, so there is a first
                // child.
                let head = self.compile_node(children[0]);
                let mut accept = head.accept;
                for &child in &children[1..] {
                    let next = self.compile_node(child);
                    self.builder.add(accept, None, next.start);
                    accept = next.accept;
                }
                Fragment {
                    start: head.start,
                    accept,
                }
            }
            Node::Alternation { first, count } => {
                let start = self.builder.new_state();
                let children: Vec<Fragment> = self
                    .pattern
                    .children(first, count)
                    .map(|child| self.compile_node(child))
                    .collect();
                let accept = self.builder.new_state();
                for child in children {
                    self.builder.add(start, None, child.start);
                    self.builder.add(child.accept, None, accept);
                }
                Fragment { start, accept }
            }
            Node::Repeat { child, kind } => {
                let start = self.builder.new_state();
                let body = self.compile_node(child);
                let accept = self.builder.new_state();
                self.builder.add(start, None, body.start);
                self.builder.add(body.accept, None, accept);
                match kind {
                    RepeatKind::ZeroOrMore => {
                        self.builder.add(start, None, accept);
                        self.builder.add(body.accept, None, body.start);
                    }
                    RepeatKind::OnceOrMore => {
                        self.builder.add(body.accept, None, body.start);
                    }
                    RepeatKind::ZeroOrOnce => {
                        self.builder.add(start, None, accept);
                    }
                }
                Fragment { start, accept }
            }
        }
    }

    /// Two states joined by one transition per byte.
    fn compile_bytes(&mut self, bytes: impl IntoIterator<Item = u8>) -> Fragment {
        let start = self.builder.new_state();
        let accept = self.builder.new_state();
        for byte in bytes {
            self.builder.add(start, Some(byte), accept);
        }
        Fragment { start, accept }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn nfa(pattern: &str) -> Nfa {
        compile(&parse(pattern).unwrap())
    }

    fn accept_states(nfa: &Nfa) -> Vec<StateRef> {
        nfa.states().filter(|&s| nfa.is_accept(s)).collect()
    }

    #[test]
    fn exactly_one_accept_state() {
        for pattern in ["", "a", "abc", "a|b|c", "a*", "(ab)+c?", "[0-9a-f]+"] {
            assert_eq!(accept_states(&nfa(pattern)).len(), 1, "{pattern:?}");
        }
    }

    #[test]
    fn char_fragment_shape() {
        let nfa = nfa("a");
        assert_eq!(nfa.state_count(), 2);
        let transitions = nfa.transitions(StateRef::START);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].symbol, Some(b'a'));
        assert!(nfa.is_accept(transitions[0].dst));
    }

    #[test]
    fn any_not_nl_has_255_transitions() {
        let nfa = nfa(".");
        let transitions = nfa.transitions(StateRef::START);
        assert_eq!(transitions.len(), 255);
        assert!(transitions.iter().all(|t| t.symbol != Some(b'\n')));
    }

    #[test]
    fn empty_pattern_single_state() {
        let nfa = nfa("");
        assert_eq!(nfa.state_count(), 1);
        assert!(nfa.is_accept(StateRef::START));
        assert!(nfa.transitions(StateRef::START).is_empty());
    }

    #[test]
    fn inverted_class_excludes_range() {
        let nfa = nfa("[^b-l]");
        let symbols: Vec<u8> = nfa
            .transitions(StateRef::START)
            .iter()
            .filter_map(|t| t.symbol)
            .collect();
        assert!(symbols.contains(&b'a'));
        assert!(symbols.contains(&b'm'));
        assert!(!symbols.contains(&b'b'));
        assert!(!symbols.contains(&b'l'));
        assert_eq!(symbols.len(), 256 - 11);
    }
}
