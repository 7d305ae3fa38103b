//! First-pass encoding of statements into machine words
//!
//! Instructions append to the instruction-word stream, data
//! directives to the data-word stream; IC and DC advance one word at
//! a time. Identifier operands whose symbols are not known yet get a
//! placeholder word and a deferred fixup for the second pass.

use super::context::{EntryDecl, ExternDecl, FileContext};
use super::statement::{
    DataDirective, Instruction, LineInfo, OperandPayload, Statement, StatementCategory,
};
use super::token::Token;
use super::{Address, Word};

/// External references resolve to 1, relocatable addresses to 2;
/// absolute words keep the implicit 0
pub const ARE_EXTERN: Word = 1;
pub const ARE_RELOC: Word = 2;

/// Bit offsets inside a word: the header packs
/// `[opcode:4 | src mode:2 | dst mode:2 | ARE:2]`, operand words put
/// their payload at bits 2..9 and register numbers at the position's
/// own offset
pub const SHIFT_OPCODE: u32 = 6;
pub const SHIFT_SRC_MODE: u32 = 4;
pub const SHIFT_DST_MODE: u32 = 2;
pub const SHIFT_VALUE: u32 = 2;
pub const SHIFT_SRC_REG: u32 = 6;
pub const SHIFT_DST_REG: u32 = 2;

const STRING_TERMINATOR: Word = 0;

/// An instruction word awaiting its symbol: rewritten in place on
/// the second pass
#[derive(Debug, Clone)]
pub struct Fixup {
    pub ic: Address,
    pub line: usize,
    pub token: Token,
}

/// One line of the `.ent` or `.ext` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutRecord {
    pub address: Address,
    pub name: String,
}

/// The encoder's output: both word streams plus everything the
/// second pass and the emitter need
pub struct CodeGen {
    pub instr_words: Vec<Word>,
    pub data_words: Vec<Word>,
    pub fixups: Vec<Fixup>,
    pub entry_records: Vec<OutRecord>,
    pub extern_records: Vec<OutRecord>,
}

impl CodeGen {
    pub fn new() -> Self {
        CodeGen {
            instr_words: Vec::new(),
            data_words: Vec::new(),
            fixups: Vec::new(),
            entry_records: Vec::new(),
            extern_records: Vec::new(),
        }
    }

    /// Encode one successfully parsed statement, registering its
    /// label first so the label points at the statement's first word
    pub fn assemble(&mut self, statement: &Statement, info: &LineInfo, ctx: &mut FileContext) {
        register_label(info, statement.category(), ctx);
        match statement {
            Statement::Instruction(ins) => self.instruction(ins, ctx),
            Statement::Directive(dir) => self.directive(dir, ctx),
        }
    }

    fn instruction(&mut self, ins: &Instruction, ctx: &mut FileContext) {
        let mut header = ins.op.code() << SHIFT_OPCODE;
        if let Some(src) = &ins.src {
            header |= src.mode.code() << SHIFT_SRC_MODE;
        }
        if let Some(dst) = &ins.dst {
            header |= dst.mode.code() << SHIFT_DST_MODE;
        }
        self.push_instruction(header, ctx);

        // Two register operands share a single word.
        if let (Some(OperandPayload::Register(s)), Some(OperandPayload::Register(d))) = (
            ins.src.as_ref().map(|o| &o.payload),
            ins.dst.as_ref().map(|o| &o.payload),
        ) {
            self.push_instruction(
                (Word::from(*s) << SHIFT_SRC_REG) | (Word::from(*d) << SHIFT_DST_REG),
                ctx,
            );
            return;
        }

        for (operand, register_shift) in [(&ins.src, SHIFT_SRC_REG), (&ins.dst, SHIFT_DST_REG)] {
            let Some(operand) = operand else {
                continue;
            };
            match &operand.payload {
                OperandPayload::Immediate(value) => {
                    self.push_instruction(*value << SHIFT_VALUE, ctx);
                }
                OperandPayload::Register(number) => {
                    self.push_instruction(Word::from(*number) << register_shift, ctx);
                }
                OperandPayload::Direct(ident) => {
                    self.identifier_word(ident, ctx);
                }
                OperandPayload::StructField { ident, field } => {
                    self.identifier_word(ident, ctx);
                    self.push_instruction(*field << SHIFT_VALUE, ctx);
                }
            }
        }
    }

    /// The word for an identifier operand. A label already defined by
    /// an instruction statement has a final address; a declared
    /// extern resolves right away and lands in the externals output;
    /// anything else gets a placeholder and a deferred fixup.
    fn identifier_word(&mut self, ident: &Token, ctx: &mut FileContext) {
        let instruction_label = ctx
            .find_label(&ident.text)
            .filter(|label| label.category == StatementCategory::Instruction)
            .map(|label| label.address);

        if let Some(address) = instruction_label {
            self.push_instruction(((address << SHIFT_VALUE) as Word) | ARE_RELOC, ctx);
        } else if ctx.find_extern(&ident.text).is_some() {
            ctx.mark_extern_used(&ident.text);
            self.extern_records.push(OutRecord {
                address: ctx.ic,
                name: ident.text.clone(),
            });
            self.push_instruction(ARE_EXTERN, ctx);
        } else {
            self.fixups.push(Fixup {
                ic: ctx.ic,
                line: ctx.line_number,
                token: ident.clone(),
            });
            self.push_instruction(ARE_RELOC, ctx);
        }
    }

    fn directive(&mut self, directive: &DataDirective, ctx: &mut FileContext) {
        match directive {
            DataDirective::Data(values) => {
                for value in values {
                    self.push_data(*value, ctx);
                }
            }
            DataDirective::Text(body) => self.push_text(body, ctx),
            DataDirective::Struct { number, text } => {
                self.push_data(*number, ctx);
                self.push_text(text, ctx);
            }
            DataDirective::Entry(token) => ctx.entries.push(EntryDecl {
                name: token.text.clone(),
                span: token.span,
                line: ctx.line_number,
            }),
            DataDirective::Extern(token) => ctx.externs.push(ExternDecl {
                name: token.text.clone(),
                span: token.span,
                line: ctx.line_number,
                used: false,
            }),
        }
    }

    fn push_text(&mut self, body: &str, ctx: &mut FileContext) {
        for ch in body.chars() {
            self.push_data(ch as Word, ctx);
        }
        self.push_data(STRING_TERMINATOR, ctx);
    }

    fn push_instruction(&mut self, word: Word, ctx: &mut FileContext) {
        self.instr_words.push(word);
        ctx.ic += 1;
    }

    fn push_data(&mut self, word: Word, ctx: &mut FileContext) {
        self.data_words.push(word);
        ctx.dc += 1;
    }
}

/// Register the line's label at the current counter. An instruction
/// label points into the instruction block; a data label records its
/// DC offset and is shifted behind the instruction block later.
fn register_label(info: &LineInfo, category: StatementCategory, ctx: &mut FileContext) {
    let Some(label) = &info.label else {
        return;
    };
    if info.leading_whitespace {
        ctx.warning_at(label.span, "label has leading whitespace");
    }
    let address = match category {
        StatementCategory::Instruction => ctx.ic,
        StatementCategory::Data => ctx.dc,
    };
    ctx.labels.insert(
        label.text.clone(),
        super::context::LabelDef {
            address,
            line: ctx.line_number,
            category,
        },
    );
}
