//! Assembles source files for a 10-bit-word machine in a two-pass manner
//!
//! The machine has 256 words of addressable memory. Instructions are
//! encoded as one header word plus up to four operand words; the two
//! low bits of every word carry the A/R/E field (absolute,
//! relocatable or external).
//!
//! A source line is an optional `label:` followed by either an
//! instruction or a data directive. Comment lines start with `;`.
//!
//! Instructions (operand syntaxes: `#n` immediate, `name` direct,
//! `name.1`/`name.2` struct field, `r0`..`r7` register):
//! - mov, cmp, add, sub: two operands
//! - not, clr, inc, dec, jmp, bne, red, prn, jsr: one operand
//! - lea: two operands, source must be addressable (no immediate
//!   or register source)
//! - rts, stop: no operands
//!
//! Directives:
//! - `.data n, n, ...`: store signed 10-bit numbers
//! - `.string "..."`: store a string, zero-terminated
//! - `.struct n, "..."`: store a number followed by a string
//! - `.entry name`: export the label `name` through the `.ent` file
//! - `.extern name`: import `name`; its use sites land in the `.ext` file
//!
//! The first pass tokenizes and parses each line, encodes every word
//! it can, and defers operands whose symbols are not yet known. After
//! the instruction block size is final, data labels are offset behind
//! it and the second pass patches the deferred words, resolves
//! entries and audits externs. Output is skipped for a file that
//! produced any error.

pub mod codegen;
pub mod context;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod reader;
pub mod resolve;
pub mod statement;
pub mod stream;
pub mod token;

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;

use crate::logging;
use codegen::CodeGen;
use context::FileContext;
use parser::Parser;
use reader::{LineReader, LineStatus, MAX_LINE_LEN, is_comment_or_blank};

/// A 10-bit machine word, stored in the low bits
pub type Word = u16;

/// A word address in machine memory
pub type Address = u32;

/// Address of the first instruction word
pub const IC_INIT: Address = 100;
/// Initial data counter; the data block is offset behind the
/// instruction block only after the first pass
pub const DC_INIT: Address = 0;
/// Total words of machine memory
pub const MAX_MEMORY_WORDS: Address = 256;

/// Longest accepted label or identifier
pub const MAX_IDENT_LEN: usize = 30;
/// Longest accepted base name, leaving room for the extension
pub const MAX_BASENAME_LEN: usize = 1020;

pub const SOURCE_EXTENSION: &str = ".as";
pub const OBJECT_EXTENSION: &str = ".ob";
pub const ENTRIES_EXTENSION: &str = ".ent";
pub const EXTERNALS_EXTENSION: &str = ".ext";

/// Assemble `<base>.as` into `<base>.ob` (plus `<base>.ent` and
/// `<base>.ext` when exports or imports exist). Returns whether the
/// file assembled cleanly.
pub fn assemble_base(base: &str) -> bool {
    if base.chars().count() > MAX_BASENAME_LEN {
        logging::error(format!("base name is too long: {base}"));
        return false;
    }

    let source_path = format!("{base}{SOURCE_EXTENSION}");
    let file = match File::open(&source_path) {
        Ok(file) => file,
        Err(err) => {
            logging::error(format!("cannot open {source_path}: {err}"));
            return false;
        }
    };
    println!("{source_path}:");

    let mut ctx = FileContext::new();
    let mut codegen = CodeGen::new();

    first_pass(&mut ctx, &mut codegen, BufReader::new(file));
    resolve::apply_ic_offset(&mut ctx);
    resolve::second_pass(&mut codegen, &mut ctx);

    if ctx.error {
        println!(
            "assembly failed, {} error(s) in {} line(s)",
            ctx.error_count, ctx.line_number
        );
        return false;
    }
    if let Err(err) = output::write_outputs(base, &codegen, &ctx) {
        logging::error(format!("cannot write output for {base}: {err}"));
        return false;
    }
    println!("assembly finished, {} line(s) read", ctx.line_number);
    true
}

/// Run the first pass over `input`: lex, parse and encode every line,
/// collecting symbols and deferred fixups into `ctx` and `codegen`.
pub fn first_pass<R: BufRead>(ctx: &mut FileContext, codegen: &mut CodeGen, input: R) {
    let mut reader = LineReader::new(input);
    let mut line = String::new();
    let mut memory_exceeded = false;

    loop {
        let status = match reader.read_line(&mut line) {
            Ok(LineStatus::Eof) => break,
            Ok(status) => status,
            Err(err) => {
                logging::error(format!("read failed: {err}"));
                ctx.error = true;
                ctx.error_count += 1;
                break;
            }
        };

        ctx.advance_line(&line);
        if is_comment_or_blank(&line) {
            continue;
        }
        if matches!(status, LineStatus::TooLong) {
            ctx.error_on_line("line too long");
            ctx.note(&format!("maximum line length is {MAX_LINE_LEN} characters"));
            continue;
        }

        let Some(tokens) = lexer::tokenize(ctx) else {
            continue;
        };
        let leading_whitespace = line.starts_with([' ', '\t']);
        let (statement, info) = Parser::new(&tokens, ctx).parse_line(leading_whitespace);
        if let Some(statement) = statement {
            codegen.assemble(&statement, &info, ctx);
        }

        // The check runs once; later statements are still parsed so
        // their own errors surface, but the file is already failed.
        if !memory_exceeded && ctx.ic + ctx.dc > MAX_MEMORY_WORDS {
            memory_exceeded = true;
            ctx.error_on_line("machine memory exceeded");
            ctx.note(&format!(
                "at most {MAX_MEMORY_WORDS} words of code and data fit in memory"
            ));
        }
    }
}
