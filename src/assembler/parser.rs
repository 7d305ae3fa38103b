//! Turns a line of tokens into a typed statement
//!
//! The parser first peels off an optional `label:` prefix, then
//! dispatches on the next token: an operator starts an instruction
//! statement, a `.` starts a data directive. Anything a statement is
//! not allowed to do (wrong addressing mode, out-of-range number,
//! reserved word as a label, stray tokens) is reported here, against
//! the token that caused it.

use super::MAX_IDENT_LEN;
use super::Word;
use super::context::FileContext;
use super::statement::{
    DataDirective, Instruction, LineInfo, Operand, OperandPayload, Statement,
};
use super::stream::TokenStream;
use super::token::{
    AddressingMode, DirectiveKind, OpDescriptor, Opcode, Span, Token, TokenKind,
};

pub const IMMEDIATE_MIN: i64 = -128;
pub const IMMEDIATE_MAX: i64 = 127;
pub const DATA_MIN: i64 = -512;
pub const DATA_MAX: i64 = 511;

/// Reduce a signed immediate to its 8-bit two's-complement residue
fn reduce_immediate(value: i64) -> Word {
    if value < 0 {
        (value + 256) as Word
    } else {
        value as Word
    }
}

/// Reduce a signed data number to its 10-bit two's-complement residue
fn reduce_data(value: i64) -> Word {
    if value < 0 {
        (value + 1024) as Word
    } else {
        value as Word
    }
}

fn number_value(text: &str) -> Option<i64> {
    text.parse().ok()
}

fn string_body(literal: &str) -> String {
    literal[1..literal.len() - 1].to_string()
}

/// What a grammar position accepts; used for uniform "unexpected
/// token" reporting
#[derive(Debug, Clone, Copy)]
enum Expected {
    Number,
    StringLit,
    Identifier,
    Directive,
    Comma,
    Eol,
}

impl Expected {
    fn matches(self, kind: TokenKind) -> bool {
        match self {
            Expected::Number => matches!(kind, TokenKind::Number),
            Expected::StringLit => matches!(kind, TokenKind::StringLit),
            Expected::Identifier => matches!(kind, TokenKind::Identifier),
            Expected::Directive => matches!(kind, TokenKind::Directive(_)),
            Expected::Comma => matches!(kind, TokenKind::Comma),
            Expected::Eol => matches!(kind, TokenKind::Eol),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Expected::Number => "a number",
            Expected::StringLit => "a string literal",
            Expected::Identifier => "an identifier",
            Expected::Directive => "a data directive",
            Expected::Comma => "','",
            Expected::Eol => "end of line",
        }
    }
}

pub struct Parser<'t, 'c> {
    ts: TokenStream<'t>,
    ctx: &'c mut FileContext,
}

impl<'t, 'c> Parser<'t, 'c> {
    pub fn new(tokens: &'t [Token], ctx: &'c mut FileContext) -> Self {
        Parser {
            ts: TokenStream::new(tokens),
            ctx,
        }
    }

    /// Parse the whole line. `None` means the statement was invalid
    /// and the error already reported; the returned [LineInfo] still
    /// carries the label facts gathered along the way.
    pub fn parse_line(mut self, leading_whitespace: bool) -> (Option<Statement>, LineInfo) {
        let mut info = LineInfo {
            leading_whitespace,
            ..LineInfo::default()
        };
        if !self.label(&mut info) {
            info.label = None;
            return (None, info);
        }
        let statement = self.statement(&mut info);
        (statement, info)
    }

    /// Peel off a `token:` prefix. A head identifier not followed by
    /// `:` (or the end of the line) is a parse error; a non-identifier
    /// head followed by `:` is kept as an invalid label for the
    /// statement dispatcher to judge.
    fn label(&mut self, info: &mut LineInfo) -> bool {
        self.ts.save();

        let mut is_identifier = false;
        if self.ts.current().kind == TokenKind::Identifier {
            is_identifier = true;
            self.ts.advance();
        }

        // A lone token is not a label; let statement dispatch deal
        // with it from the start of the line.
        if self.ts.is_eol() {
            self.ts.restore();
            return true;
        }
        if !is_identifier {
            self.ts.advance();
        }

        if self.ts.current().kind == TokenKind::Colon {
            info.label = Some(self.ts.previous().clone());
            info.label_is_identifier = is_identifier;
            self.ts.advance();
            true
        } else if is_identifier {
            let span = self.ts.previous().span;
            self.ctx
                .error_at(span, "expected a label definition, operator or data directive");
            false
        } else {
            self.ts.restore();
            true
        }
    }

    fn statement(&mut self, info: &mut LineInfo) -> Option<Statement> {
        if self.ts.is_eol() {
            let span = self.ts.current().span;
            self.ctx
                .error_at(span, "statement has no operator or data directive");
            return None;
        }

        match self.ts.current().kind {
            TokenKind::Dot => {
                self.ts.advance();
                if !self.expect_current(Expected::Directive) {
                    return None;
                }
                let TokenKind::Directive(kind) = self.ts.current().kind else {
                    return None;
                };
                // Labels are reserved for word-emitting statements;
                // on .entry/.extern lines they are dropped outright.
                if matches!(kind, DirectiveKind::Entry | DirectiveKind::Extern) {
                    info.label = None;
                } else if !self.check_label(info) {
                    return None;
                }
                self.directive(kind).map(Statement::Directive)
            }
            TokenKind::Op(op) => {
                if !self.check_label(info) {
                    return None;
                }
                self.instruction(op).map(Statement::Instruction)
            }
            _ => {
                let span = self.ts.current().span;
                self.ctx.error_at(span, "expected an operator or data directive");
                None
            }
        }
    }

    fn check_label(&mut self, info: &LineInfo) -> bool {
        let Some(label) = info.label.clone() else {
            return true;
        };
        if !self.validate_label(&label) {
            return false;
        }
        if !info.label_is_identifier {
            self.ctx.error_at(label.span, "invalid label");
            return false;
        }
        true
    }

    fn validate_label(&mut self, label: &Token) -> bool {
        if label.kind.is_reserved() {
            self.ctx
                .error_at(label.span, "reserved word cannot be used as a label");
            return false;
        }
        if label.text.chars().count() > MAX_IDENT_LEN {
            self.ctx.error_at(label.span, "label is too long");
            self.ctx
                .note(&format!("maximum label length is {MAX_IDENT_LEN}"));
            return false;
        }
        if let Some(line) = self.ctx.find_label(&label.text).map(|l| l.line) {
            self.ctx.error_at(label.span, "label is already defined");
            self.ctx.note(&format!("previously defined at line {line}"));
            return false;
        }
        if let Some(line) = self.ctx.find_extern(&label.text).map(|e| e.line) {
            self.ctx
                .error_at(label.span, "label was already declared extern");
            self.ctx.note(&format!("declared at line {line}"));
            return false;
        }
        true
    }

    fn instruction(&mut self, op: Opcode) -> Option<Instruction> {
        let desc = op.descriptor();
        let op_span = self.ts.current().span;
        self.ts.advance();

        if self.ts.is_eol() {
            if desc.operands != 0 {
                self.ctx.error_at(op_span, "operator has no operands");
                self.note_operand_count(desc);
                return None;
            }
        } else if desc.operands == 0 {
            let span = self.ts.current().span;
            self.ctx
                .error_at(span, "extraneous token after a zero-operand operator");
            return None;
        }

        let mut src = None;
        let mut dst = None;
        let mut operand_error = false;
        let mut parsed = 0;

        for position in 0..desc.operands {
            if self.ts.is_eol() {
                let cur = self.ts.current().span;
                let span = Span {
                    start: op_span.start,
                    len: cur.start.saturating_sub(op_span.start).saturating_sub(1),
                };
                self.ctx.error_at(span, "not enough operands");
                self.note_operand_count(desc);
                operand_error = true;
                break;
            }

            let source_position = desc.operands == 2 && position == 0;
            let allowed = if source_position {
                &desc.src_modes
            } else {
                &desc.dst_modes
            };
            match self.operand() {
                None => operand_error = true,
                Some(operand) => {
                    if !allowed[operand.mode as usize] {
                        self.ctx.error_at(operand.span, "invalid addressing mode");
                        self.note_valid_modes(allowed);
                        operand_error = true;
                    } else if source_position {
                        src = Some(operand);
                    } else {
                        dst = Some(operand);
                    }
                }
            }
            parsed += 1;
        }

        let ended = parsed == desc.operands && self.proper_ending(desc);
        if ended && !operand_error {
            Some(Instruction { op, src, dst })
        } else {
            None
        }
    }

    /// The token stream has to sit at the end of the line once all
    /// operands are consumed
    fn proper_ending(&mut self, desc: &OpDescriptor) -> bool {
        let prev = self.ts.previous().span;
        let cur = self.ts.current().span;
        if self.ts.previous().kind == TokenKind::Comma {
            if !self.ts.is_eol() {
                let span = Span {
                    start: prev.start,
                    len: cur.start - prev.start + cur.len,
                };
                self.ctx.error_at(span, "too many operands");
                self.note_operand_count(desc);
            } else {
                let span = Span {
                    start: prev.start,
                    len: 1,
                };
                self.ctx
                    .error_at(span, "trailing comma at the end of the statement");
            }
            false
        } else if !self.ts.is_eol() {
            let span = Span {
                start: prev.start,
                len: cur.start - prev.start + cur.len,
            };
            self.ctx
                .error_at(span, "extraneous token at the end of the statement");
            false
        } else {
            true
        }
    }

    /// Read one operand and its trailing delimiter. On a delimiter
    /// error the stream skips ahead to the next comma or the end of
    /// the line so the remaining operands still get parsed.
    fn operand(&mut self) -> Option<Operand> {
        self.ts.save();

        let mut operand = match self.ts.current().kind {
            TokenKind::Hash => self.operand_immediate(),
            TokenKind::Identifier => {
                if self.ts.current().text.chars().count() > MAX_IDENT_LEN {
                    let span = self.ts.current().span;
                    self.ctx.error_at(span, "identifier is too long");
                    self.ctx
                        .note(&format!("maximum identifier length is {MAX_IDENT_LEN}"));
                    self.ts.advance();
                    None
                } else {
                    self.ts.advance();
                    let struct_access = self.ts.current().kind == TokenKind::Dot;
                    self.ts.restore();
                    if struct_access {
                        self.operand_struct()
                    } else {
                        self.operand_direct()
                    }
                }
            }
            TokenKind::Register(number) => self.operand_register(number),
            _ => {
                let span = self.ts.current().span;
                self.ctx.error_at(span, "invalid operand");
                self.ts.advance();
                None
            }
        };

        if !self.ts.is_eol() && self.ts.current().kind != TokenKind::Comma {
            let span = self.ts.current().span;
            self.ctx
                .error_at(span, "expected ',' or end of line after an operand");
            operand = None;
            while !self.ts.is_eol() && self.ts.current().kind != TokenKind::Comma {
                self.ts.advance();
            }
        }
        self.ts.advance();
        operand
    }

    fn operand_immediate(&mut self) -> Option<Operand> {
        let hash_span = self.ts.current().span;
        self.ts.advance();

        let value_token = self.ts.current().clone();
        let span = Span {
            start: hash_span.start,
            len: hash_span.len + value_token.span.len,
        };
        let operand = if value_token.kind == TokenKind::Number {
            match number_value(&value_token.text) {
                Some(n) if (IMMEDIATE_MIN..=IMMEDIATE_MAX).contains(&n) => Some(Operand {
                    span,
                    mode: AddressingMode::Immediate,
                    payload: OperandPayload::Immediate(reduce_immediate(n)),
                }),
                _ => {
                    let number_span = Span {
                        start: span.start + 1,
                        len: span.len - 1,
                    };
                    self.ctx.error_at(number_span, "number out of bounds");
                    self.ctx.note(&format!(
                        "allowed immediate range is {IMMEDIATE_MIN} to {IMMEDIATE_MAX}"
                    ));
                    None
                }
            }
        } else {
            self.ctx.error_at(span, "'#' must be followed by a number");
            None
        };
        self.ts.advance();
        operand
    }

    fn operand_direct(&mut self) -> Option<Operand> {
        let token = self.ts.current().clone();
        self.ts.advance();
        Some(Operand {
            span: token.span,
            mode: AddressingMode::Direct,
            payload: OperandPayload::Direct(token),
        })
    }

    /// The cursor sits at an identifier known to be followed by a dot
    fn operand_struct(&mut self) -> Option<Operand> {
        let ident = self.ts.current().clone();
        self.ts.advance();
        self.ts.advance();

        let field_token = self.ts.current().clone();
        let span = Span {
            start: ident.span.start,
            len: ident.span.len + 1 + field_token.span.len,
        };
        let operand = if field_token.kind == TokenKind::Number {
            match number_value(&field_token.text) {
                Some(field @ (1 | 2)) => Some(Operand {
                    span,
                    mode: AddressingMode::Struct,
                    payload: OperandPayload::StructField {
                        ident,
                        field: field as Word,
                    },
                }),
                _ => {
                    self.ctx.error_at(span, "struct field must be 1 or 2");
                    None
                }
            }
        } else {
            self.ctx.error_at(span, "invalid struct field access");
            None
        };
        self.ts.advance();
        operand
    }

    fn operand_register(&mut self, number: u8) -> Option<Operand> {
        let span = self.ts.current().span;
        let operand = if number > 7 {
            self.ctx.error_at(span, "invalid register");
            self.ctx.note("valid registers are r0 through r7");
            None
        } else {
            Some(Operand {
                span,
                mode: AddressingMode::Register,
                payload: OperandPayload::Register(number),
            })
        };
        self.ts.advance();
        operand
    }

    fn directive(&mut self, kind: DirectiveKind) -> Option<DataDirective> {
        self.ts.advance();
        match kind {
            DirectiveKind::Data => self.data_values().map(DataDirective::Data),
            DirectiveKind::Struct => self.struct_directive(),
            DirectiveKind::String => {
                self.ts.save();
                if !self.expect_sequence(&[Expected::StringLit, Expected::Eol]) {
                    return None;
                }
                self.ts.restore();
                Some(DataDirective::Text(string_body(&self.ts.current().text)))
            }
            DirectiveKind::Entry | DirectiveKind::Extern => {
                self.ts.save();
                if !self.expect_sequence(&[Expected::Identifier, Expected::Eol]) {
                    return None;
                }
                self.ts.restore();
                if self.ts.current().text.chars().count() > MAX_IDENT_LEN {
                    let span = self.ts.current().span;
                    self.ctx.error_at(span, "identifier is too long");
                    self.ctx
                        .note(&format!("maximum identifier length is {MAX_IDENT_LEN}"));
                    return None;
                }
                if kind == DirectiveKind::Entry {
                    self.entry_directive().map(DataDirective::Entry)
                } else {
                    self.extern_directive().map(DataDirective::Extern)
                }
            }
        }
    }

    fn data_values(&mut self) -> Option<Vec<Word>> {
        let mut values = Vec::new();
        loop {
            if !self.expect_current(Expected::Number) {
                return None;
            }
            let token = self.ts.current().clone();
            let Some(n) = number_value(&token.text).filter(|n| (DATA_MIN..=DATA_MAX).contains(n))
            else {
                self.ctx.error_at(token.span, "number out of bounds");
                self.ctx
                    .note(&format!("allowed range is {DATA_MIN} to {DATA_MAX}"));
                return None;
            };
            values.push(reduce_data(n));
            self.ts.advance();

            if self.ts.is_eol() {
                return Some(values);
            }
            if self.ts.current().kind == TokenKind::Comma {
                self.ts.advance();
                if self.ts.is_eol() {
                    let span = self.ts.previous().span;
                    self.ctx
                        .error_at(span, "trailing comma at the end of a data statement");
                    return None;
                }
            } else {
                let span = self.ts.current().span;
                self.ctx
                    .error_at(span, ".data accepts only comma-separated numbers");
                return None;
            }
        }
    }

    fn struct_directive(&mut self) -> Option<DataDirective> {
        self.ts.save();
        if !self.expect_sequence(&[
            Expected::Number,
            Expected::Comma,
            Expected::StringLit,
            Expected::Eol,
        ]) {
            return None;
        }
        self.ts.restore();

        let token = self.ts.current().clone();
        let Some(n) = number_value(&token.text).filter(|n| (DATA_MIN..=DATA_MAX).contains(n))
        else {
            self.ctx.error_at(token.span, "number out of bounds");
            self.ctx
                .note(&format!("allowed range is {DATA_MIN} to {DATA_MAX}"));
            return None;
        };
        self.ts.advance();
        self.ts.advance();
        Some(DataDirective::Struct {
            number: reduce_data(n),
            text: string_body(&self.ts.current().text),
        })
    }

    fn entry_directive(&mut self) -> Option<Token> {
        let token = self.ts.current().clone();
        if let Some(line) = self.ctx.find_entry(&token.text).map(|e| e.line) {
            self.ctx.warning_at(token.span, "duplicate .entry declaration");
            self.ctx.note(&format!("previously declared at line {line}"));
            None
        } else if let Some(line) = self.ctx.find_extern(&token.text).map(|e| e.line) {
            self.ctx
                .warning_at(token.span, "identifier was already declared extern");
            self.ctx.note(&format!("declared at line {line}"));
            None
        } else {
            Some(token)
        }
    }

    fn extern_directive(&mut self) -> Option<Token> {
        let token = self.ts.current().clone();
        if let Some(line) = self.ctx.find_extern(&token.text).map(|e| e.line) {
            self.ctx.warning_at(token.span, "duplicate .extern declaration");
            self.ctx.note(&format!("previously declared at line {line}"));
            None
        } else if let Some(line) = self.ctx.find_entry(&token.text).map(|e| e.line) {
            self.ctx
                .error_at(token.span, "identifier was already declared as an entry");
            self.ctx.note(&format!("declared at line {line}"));
            None
        } else if let Some(line) = self.ctx.find_label(&token.text).map(|l| l.line) {
            self.ctx
                .error_at(token.span, "identifier is already defined as a label");
            self.ctx.note(&format!("defined at line {line}"));
            None
        } else {
            Some(token)
        }
    }

    fn expect_current(&mut self, expected: Expected) -> bool {
        if expected.matches(self.ts.current().kind) {
            return true;
        }
        let span = self.ts.current().span;
        self.ctx.error_at(span, "unexpected token");
        self.ctx.note(&format!("expected {}", expected.describe()));
        false
    }

    fn expect_sequence(&mut self, sequence: &[Expected]) -> bool {
        for &expected in sequence {
            if !self.expect_current(expected) {
                return false;
            }
            self.ts.advance();
        }
        true
    }

    fn note_operand_count(&mut self, desc: &OpDescriptor) {
        self.ctx.note(&format!(
            "{} takes {} operand(s)",
            desc.mnemonic, desc.operands
        ));
    }

    fn note_valid_modes(&mut self, allowed: &[bool; 4]) {
        let names: Vec<&str> = AddressingMode::ALL
            .iter()
            .filter(|mode| allowed[**mode as usize])
            .map(|mode| mode.mnemonic())
            .collect();
        self.ctx.note(&format!(
            "valid addressing modes for this operand: {}",
            names.join(" ")
        ));
    }
}
