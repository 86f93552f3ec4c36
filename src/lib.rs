/*!
A parallel-DFA regular expression matcher.

Decides whole-string acceptance: is the entire input in the pattern's
language? The reduction that answers it has parallel depth logarithmic in
the input length, so gigabyte-scale inputs can be matched block-parallel on
a GPU-style device. The built-in CPU device runs the same two kernels on a
thread pool.

## How it works

A DFA is inherently sequential: the state after byte `i` depends on the
state after byte `i - 1`. The [`pdfa`] stage lifts the DFA to a machine
whose states are *functions* from DFA state to DFA state (or reject).
Function composition is associative, so the per-byte functions of the input
can be folded in any bracketing, in particular as a balanced tree. The
pipeline:

```text
source → Pattern → ε-NFA → DFA → parallel DFA → device tables
         syntax    thompson  subset   pdfa        engine::block
```

## Usage
```
use pardfa::Regex;

let re = Regex::new("a(bc)*a").unwrap();
assert!(re.try_is_match("abcbca").unwrap());
assert!(!re.try_is_match("abcbc").unwrap());

// Whole-string only: a match somewhere inside is not a match.
let re = Regex::new("abc").unwrap();
assert!(!re.try_is_match("xabcx").unwrap());
```

Patterns whose parallel form outgrows the device tables are rejected at
compile time:

```
use pardfa::{pdfa::BuildError, Regex};

let err = Regex::new(&"a".repeat(200)).unwrap_err();
assert!(matches!(err, BuildError::MergeTableOverflow { .. }));
```

## Syntax

`.`, `*`, `+`, `?`, `|`, `(…)`, classes `[…]` with `^` negation and `a-b`
ranges, and the escapes listed in [`syntax`]. Byte-level only; anchors are
rejected because every pattern is implicitly anchored on both ends.
*/

pub mod automata;
pub mod device;
pub mod engine;
pub mod matcher;
pub mod pdfa;
pub mod syntax;

pub use matcher::Regex;
