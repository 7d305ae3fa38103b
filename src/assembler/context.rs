//! Per-file assembler state and diagnostic printing
//!
//! Every source file gets a fresh [FileContext]; nothing survives
//! from one file to the next. Diagnostics are printed the moment
//! they are discovered, with the offending line reproduced and a
//! caret-tilde underline below the token. Errors set the sticky
//! `error` flag that suppresses output emission; warnings do not.

use std::collections::HashMap;

use colored::Colorize;

use super::statement::StatementCategory;
use super::token::Span;
use super::{Address, DC_INIT, IC_INIT};
use crate::logging;

/// A defined label: where it points and what kind of statement
/// defined it. Data labels are offset behind the instruction block
/// once the first pass fixes its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelDef {
    pub address: Address,
    pub line: usize,
    pub category: StatementCategory,
}

/// A `.entry` declaration, resolved against the label table on the
/// second pass
#[derive(Debug, Clone)]
pub struct EntryDecl {
    pub name: String,
    pub span: Span,
    pub line: usize,
}

/// A `.extern` declaration; `used` is set when the name appears as
/// an operand, and audited after resolution
#[derive(Debug, Clone)]
pub struct ExternDecl {
    pub name: String,
    pub span: Span,
    pub line: usize,
    pub used: bool,
}

/// All mutable state of the file currently being assembled
pub struct FileContext {
    pub ic: Address,
    pub dc: Address,
    pub line_number: usize,
    pub current_line: String,
    pub error: bool,
    pub error_count: u32,
    /// Every raw line read so far; second-pass diagnostics point at
    /// lines that are no longer current
    pub lines: Vec<String>,
    pub labels: HashMap<String, LabelDef>,
    pub entries: Vec<EntryDecl>,
    pub externs: Vec<ExternDecl>,
}

impl FileContext {
    pub fn new() -> Self {
        FileContext {
            ic: IC_INIT,
            dc: DC_INIT,
            line_number: 0,
            current_line: String::new(),
            error: false,
            error_count: 0,
            lines: Vec::new(),
            labels: HashMap::new(),
            entries: Vec::new(),
            externs: Vec::new(),
        }
    }

    /// Make `raw` the current line and remember it for later
    /// diagnostics
    pub fn advance_line(&mut self, raw: &str) {
        self.line_number += 1;
        self.current_line.clear();
        self.current_line.push_str(raw);
        self.lines.push(raw.to_string());
    }

    pub fn find_label(&self, name: &str) -> Option<&LabelDef> {
        self.labels.get(name)
    }

    pub fn find_entry(&self, name: &str) -> Option<&EntryDecl> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn find_extern(&self, name: &str) -> Option<&ExternDecl> {
        self.externs.iter().find(|e| e.name == name)
    }

    pub fn mark_extern_used(&mut self, name: &str) {
        if let Some(decl) = self.externs.iter_mut().find(|e| e.name == name) {
            decl.used = true;
        }
    }

    /// Report an error located at `span` on the current line
    pub fn error_at(&mut self, span: Span, message: &str) {
        logging::error(format!("line {}: {}", self.line_number, message));
        print_underlined(&self.current_line, span);
        self.error = true;
        self.error_count += 1;
    }

    /// Report an error located at `span` on an earlier line
    pub fn error_at_line(&mut self, line_number: usize, span: Span, message: &str) {
        logging::error(format!("line {line_number}: {message}"));
        if let Some(line) = self.lines.get(line_number.wrapping_sub(1)) {
            print_underlined(line, span);
        }
        self.error = true;
        self.error_count += 1;
    }

    /// Report an error concerning the whole current line
    pub fn error_on_line(&mut self, message: &str) {
        logging::error(format!("line {}: {}", self.line_number, message));
        eprintln!("    {}", displayed_line(&self.current_line).0);
        self.error = true;
        self.error_count += 1;
    }

    /// Report a non-fatal warning located at `span`; the sticky error
    /// flag is left alone
    pub fn warning_at(&mut self, span: Span, message: &str) {
        logging::warning(message.to_string(), self.line_number);
        print_underlined(&self.current_line, span);
    }

    /// Print a follow-up detail for the preceding diagnostic
    pub fn note(&self, message: &str) {
        logging::note(message.to_string());
    }
}

/// The line as shown in diagnostics: leading whitespace dropped and
/// tabs expanded to single spaces. Returns the line and the number of
/// leading whitespace characters dropped.
fn displayed_line(line: &str) -> (String, usize) {
    let lead = line.chars().take_while(|c| *c == ' ' || *c == '\t').count();
    let shown = line
        .chars()
        .skip(lead)
        .map(|c| if c == '\t' { ' ' } else { c })
        .collect();
    (shown, lead)
}

fn print_underlined(line: &str, span: Span) {
    let (shown, lead) = displayed_line(line);
    eprintln!("    {shown}");

    let mut underline = " ".repeat(span.start.saturating_sub(lead));
    underline.push('^');
    for _ in 1..span.len.max(1) {
        underline.push('~');
    }
    eprintln!("    {}", underline.green());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_sticky_and_counted() {
        let mut ctx = FileContext::new();
        ctx.advance_line("mov r1, r2");
        assert!(!ctx.error);

        ctx.error_at(Span { start: 0, len: 3 }, "test error");
        assert!(ctx.error);
        assert_eq!(ctx.error_count, 1);

        ctx.error_on_line("another");
        assert_eq!(ctx.error_count, 2);
    }

    #[test]
    fn test_warnings_do_not_fail_the_file() {
        let mut ctx = FileContext::new();
        ctx.advance_line("  label: stop");
        ctx.warning_at(Span { start: 2, len: 5 }, "test warning");
        assert!(!ctx.error);
        assert_eq!(ctx.error_count, 0);
    }

    #[test]
    fn test_lines_are_retained_for_late_diagnostics() {
        let mut ctx = FileContext::new();
        ctx.advance_line("first");
        ctx.advance_line("second");
        assert_eq!(ctx.line_number, 2);
        assert_eq!(ctx.lines, vec!["first".to_string(), "second".to_string()]);

        ctx.error_at_line(1, Span { start: 0, len: 5 }, "late error");
        assert!(ctx.error);
    }

    #[test]
    fn test_displayed_line_expands_tabs_and_drops_lead() {
        let (shown, lead) = displayed_line("\t mov\tr1");
        assert_eq!(lead, 2);
        assert_eq!(shown, "mov r1");
    }
}
