//! The flat pattern tree produced by [`parse`](crate::syntax::parse).
//!
//! Nodes live in one contiguous array addressed by 32-bit [`NodeRef`]s; the
//! root is node 0 and the children of a sequence or alternation occupy a
//! contiguous run of indices after their parent. Byte-class payloads live in
//! a side arena owned by the pattern, addressed by [`SetRef`].

use std::fmt;

use crate::syntax::charset::CharSet;

/// Index of a node in a [`Pattern`]'s node array.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeRef(pub(crate) u32);

impl NodeRef {
    /// The root node of every pattern.
    pub const ROOT: NodeRef = NodeRef(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a [`CharSet`] in a [`Pattern`]'s side arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SetRef(pub(crate) u32);

impl SetRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RepeatKind {
    /// `*`
    ZeroOrMore,
    /// `?`
    ZeroOrOnce,
    /// `+`
    OnceOrMore,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Node {
    /// Matches the empty string.
    Empty,
    /// `.`: any byte except `\n`.
    AnyNotNl,
    /// A single literal byte.
    Char(u8),
    /// A byte class.
    CharSet(SetRef),
    /// `count` children at indices `first .. first + count`, matched in order.
    Sequence { first: NodeRef, count: u32 },
    /// `count` children at indices `first .. first + count`, any one matches.
    Alternation { first: NodeRef, count: u32 },
    Repeat { child: NodeRef, kind: RepeatKind },
}

/// A parsed pattern: the node array plus the byte-class arena.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Pattern {
    nodes: Vec<Node>,
    sets: Vec<CharSet>,
}

impl Pattern {
    pub(crate) fn from_parts(nodes: Vec<Node>, sets: Vec<CharSet>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes, sets }
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn node(&self, node: NodeRef) -> &Node {
        &self.nodes[node.index()]
    }

    pub fn set(&self, set: SetRef) -> &CharSet {
        &self.sets[set.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The child refs of a sequence or alternation run.
    pub fn children(&self, first: NodeRef, count: u32) -> impl Iterator<Item = NodeRef> {
        (first.0..first.0 + count).map(NodeRef)
    }

    /// Renders the pattern back to source text.
    ///
    /// The output reparses to an equivalent pattern: metacharacters are
    /// escaped, bytes without an escape of their own (such as `*` outside a
    /// class) fall back to `\xHH`, and byte classes are emitted in their
    /// normalized form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(NodeRef::ROOT, &mut out);
        out
    }

    fn render_node(&self, node: NodeRef, out: &mut String) {
        match *self.node(node) {
            Node::Empty => {}
            Node::AnyNotNl => out.push('.'),
            Node::Char(b) => render_literal(b, out),
            Node::CharSet(set) => render_class(self.set(set), out),
            Node::Sequence { first, count } => {
                for child in self.children(first, count) {
                    // Grouped items must stay groups: an empty group renders
                    // to nothing and loses the child, a nested sequence
                    // flattens into its siblings on reparse.
                    if matches!(
                        self.node(child),
                        Node::Sequence { .. } | Node::Alternation { .. } | Node::Empty
                    ) {
                        out.push('(');
                        self.render_node(child, out);
                        out.push(')');
                    } else {
                        self.render_node(child, out);
                    }
                }
            }
            Node::Alternation { first, count } => {
                for (i, child) in self.children(first, count).enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    if matches!(self.node(child), Node::Alternation { .. }) {
                        out.push('(');
                        self.render_node(child, out);
                        out.push(')');
                    } else {
                        self.render_node(child, out);
                    }
                }
            }
            Node::Repeat { child, kind } => {
                let needs_group = matches!(
                    self.node(child),
                    Node::Sequence { .. }
                        | Node::Alternation { .. }
                        | Node::Repeat { .. }
                        | Node::Empty
                );
                if needs_group {
                    out.push('(');
                    self.render_node(child, out);
                    out.push(')');
                } else {
                    self.render_node(child, out);
                }
                out.push(match kind {
                    RepeatKind::ZeroOrMore => '*',
                    RepeatKind::ZeroOrOnce => '?',
                    RepeatKind::OnceOrMore => '+',
                });
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_literal(byte: u8, out: &mut String) {
    match byte {
        b'\n' => out.push_str(r"\n"),
        b'\r' => out.push_str(r"\r"),
        b'\t' => out.push_str(r"\t"),
        b'\\' | b'(' | b')' | b'[' | b']' | b'.' | b'^' | b'$' => {
            out.push('\\');
            out.push(byte as char);
        }
        // `*`, `+`, `?` and `|` have no escaped form of their own.
        b'*' | b'+' | b'?' | b'|' => push_hex(byte, out),
        0x20..=0x7e => out.push(byte as char),
        _ => push_hex(byte, out),
    }
}

fn render_class(set: &CharSet, out: &mut String) {
    out.push('[');
    if set.is_inverted() {
        out.push('^');
    }
    for range in set.ranges() {
        render_class_endpoint(range.min, out);
        if range.max > range.min {
            out.push('-');
            render_class_endpoint(range.max, out);
        }
    }
    out.push(']');
}

fn render_class_endpoint(byte: u8, out: &mut String) {
    match byte {
        b'\n' => out.push_str(r"\n"),
        b'\r' => out.push_str(r"\r"),
        b'\t' => out.push_str(r"\t"),
        b'\\' | b'[' | b']' | b'-' | b'^' => {
            out.push('\\');
            out.push(byte as char);
        }
        0x20..=0x7e => out.push(byte as char),
        _ => push_hex(byte, out),
    }
}

fn push_hex(byte: u8, out: &mut String) {
    out.push_str(&format!(r"\x{byte:02x}"));
}
