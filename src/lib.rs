//! A two-pass assembler for a small 10-bit-word machine, featuring:
//! - a line-oriented lexer with strict delimiter rules
//! - a statement parser with addressing-mode validation
//! - symbol resolution across instruction and data blocks
//! - object, entries and externals files in a radix-32 text format

pub mod assembler;
pub mod logging;
