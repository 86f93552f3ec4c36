/*!
Pattern syntax support: the parser, the flat pattern tree and byte-class
values.

The surface is deliberately small: `.`, `*`, `+`, `?`, `|`, groups, byte
classes `[...]` with `^` negation and `a-b` ranges, and the escapes `\n`
`\r` `\t` `\\` `\'` `\"` `\-` `\^` `\$` `\(` `\)` `\[` `\]` `\.` and
`\xHH`. Anchors, counted repetition, captures and backreferences are
rejected at parse time; matching is whole-string acceptance, so every
pattern is implicitly anchored on both ends.

## Example
```
use pardfa::syntax::{parse, Node};

let pattern = parse("a[0-9]*").unwrap();
assert!(matches!(pattern.root(), Node::Sequence { .. }));
assert_eq!(pattern.render(), "a[0-9]*");
```
*/

pub mod charset;
mod parser;
pub mod pattern;

pub use charset::{CharSet, ClosedRange};
pub use parser::{parse, ParseError, ParseErrorKind};
pub use pattern::{Node, NodeRef, Pattern, RepeatKind, SetRef};
