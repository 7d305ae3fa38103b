//! Tokens of the assembly language and the operator table

use once_cell::sync::Lazy;
use regex::Regex;

use super::Word;

static NUMBER_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap());
static IDENT_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").unwrap());

/// A span of columns in a source line. Used to neatly underline errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

/// The sixteen machine operators, in opcode order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Mov,
    Cmp,
    Add,
    Sub,
    Not,
    Clr,
    Lea,
    Inc,
    Dec,
    Jmp,
    Bne,
    Red,
    Prn,
    Jsr,
    Rts,
    Stop,
}

impl Opcode {
    pub fn code(self) -> Word {
        self as Word
    }

    pub fn descriptor(self) -> &'static OpDescriptor {
        &OPS[self as usize]
    }
}

/// How an operand is interpreted; the discriminant is the value
/// encoded into the header word's mode fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Immediate = 0,
    Direct = 1,
    Struct = 2,
    Register = 3,
}

impl AddressingMode {
    pub const ALL: [AddressingMode; 4] = [
        AddressingMode::Immediate,
        AddressingMode::Direct,
        AddressingMode::Struct,
        AddressingMode::Register,
    ];

    pub fn code(self) -> Word {
        self as Word
    }

    /// The name used when diagnostics list permitted modes
    pub fn mnemonic(self) -> &'static str {
        match self {
            AddressingMode::Immediate => "IMM",
            AddressingMode::Direct => "DIR",
            AddressingMode::Struct => "STRUCT",
            AddressingMode::Register => "REG",
        }
    }
}

/// The five data directives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Data,
    String,
    Struct,
    Entry,
    Extern,
}

/// One row of the operator table: operand count plus the addressing
/// modes each operand position accepts
pub struct OpDescriptor {
    pub mnemonic: &'static str,
    pub op: Opcode,
    pub operands: u8,
    pub src_modes: [bool; 4],
    pub dst_modes: [bool; 4],
}

/// The operator table, indexed by opcode.
/// Mode order in the permission arrays: IMM, DIR, STRUCT, REG.
#[rustfmt::skip]
pub static OPS: [OpDescriptor; 16] = [
    OpDescriptor { mnemonic: "mov",  op: Opcode::Mov,  operands: 2, src_modes: [true,  true,  true,  true ], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "cmp",  op: Opcode::Cmp,  operands: 2, src_modes: [true,  true,  true,  true ], dst_modes: [true,  true,  true,  true ] },
    OpDescriptor { mnemonic: "add",  op: Opcode::Add,  operands: 2, src_modes: [true,  true,  true,  true ], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "sub",  op: Opcode::Sub,  operands: 2, src_modes: [true,  true,  true,  true ], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "not",  op: Opcode::Not,  operands: 1, src_modes: [false, false, false, false], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "clr",  op: Opcode::Clr,  operands: 1, src_modes: [false, false, false, false], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "lea",  op: Opcode::Lea,  operands: 2, src_modes: [false, true,  true,  false], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "inc",  op: Opcode::Inc,  operands: 1, src_modes: [false, false, false, false], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "dec",  op: Opcode::Dec,  operands: 1, src_modes: [false, false, false, false], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "jmp",  op: Opcode::Jmp,  operands: 1, src_modes: [false, false, false, false], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "bne",  op: Opcode::Bne,  operands: 1, src_modes: [false, false, false, false], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "red",  op: Opcode::Red,  operands: 1, src_modes: [false, false, false, false], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "prn",  op: Opcode::Prn,  operands: 1, src_modes: [false, false, false, false], dst_modes: [true,  true,  true,  true ] },
    OpDescriptor { mnemonic: "jsr",  op: Opcode::Jsr,  operands: 1, src_modes: [false, false, false, false], dst_modes: [false, true,  true,  true ] },
    OpDescriptor { mnemonic: "rts",  op: Opcode::Rts,  operands: 0, src_modes: [false, false, false, false], dst_modes: [false, false, false, false] },
    OpDescriptor { mnemonic: "stop", op: Opcode::Stop, operands: 0, src_modes: [false, false, false, false], dst_modes: [false, false, false, false] },
];

static DIRECTIVES: [(&str, DirectiveKind); 5] = [
    ("data", DirectiveKind::Data),
    ("string", DirectiveKind::String),
    ("struct", DirectiveKind::Struct),
    ("entry", DirectiveKind::Entry),
    ("extern", DirectiveKind::Extern),
];

/// What a token is in the language. Registers `r8` and `r9` are
/// recognized here but rejected when used as register operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Dot,
    Comma,
    Colon,
    Hash,
    Quote,
    Number,
    StringLit,
    Identifier,
    Op(Opcode),
    Register(u8),
    Directive(DirectiveKind),
    Eol,
    Unknown,
}

impl TokenKind {
    /// Reserved words cannot name a label
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            TokenKind::Op(_) | TokenKind::Register(_) | TokenKind::Directive(_)
        )
    }
}

/// A lexed token: where it sits in the line, what it is, and its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub span: Span,
    pub kind: TokenKind,
    pub text: String,
}

/// Classify a lexeme by exact match against the reserved tables,
/// falling back to number, then identifier, then unknown
pub fn classify(text: &str) -> TokenKind {
    if NUMBER_SHAPE.is_match(text) {
        return TokenKind::Number;
    }

    let mut chars = text.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        match ch {
            '.' => return TokenKind::Dot,
            ',' => return TokenKind::Comma,
            ':' => return TokenKind::Colon,
            '#' => return TokenKind::Hash,
            '"' => return TokenKind::Quote,
            _ => {}
        }
    } else {
        if let Some(descriptor) = OPS.iter().find(|d| d.mnemonic == text) {
            return TokenKind::Op(descriptor.op);
        }
        if let Some(number) = register_number(text) {
            return TokenKind::Register(number);
        }
        if let Some(&(_, kind)) = DIRECTIVES.iter().find(|(name, _)| *name == text) {
            return TokenKind::Directive(kind);
        }
    }

    if IDENT_SHAPE.is_match(text) {
        return TokenKind::Identifier;
    }
    TokenKind::Unknown
}

fn register_number(text: &str) -> Option<u8> {
    let digit = text.strip_prefix('r')?;
    if digit.len() != 1 {
        return None;
    }
    digit.chars().next()?.to_digit(10).map(|n| n as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reserved_words() {
        assert_eq!(classify("mov"), TokenKind::Op(Opcode::Mov));
        assert_eq!(classify("stop"), TokenKind::Op(Opcode::Stop));
        assert_eq!(classify("r0"), TokenKind::Register(0));
        assert_eq!(classify("r9"), TokenKind::Register(9));
        assert_eq!(classify("data"), TokenKind::Directive(DirectiveKind::Data));
        assert_eq!(
            classify("extern"),
            TokenKind::Directive(DirectiveKind::Extern)
        );
    }

    #[test]
    fn test_classify_numbers_and_identifiers() {
        assert_eq!(classify("42"), TokenKind::Number);
        assert_eq!(classify("-7"), TokenKind::Number);
        assert_eq!(classify("+15"), TokenKind::Number);
        assert_eq!(classify("x"), TokenKind::Identifier);
        assert_eq!(classify("loop2"), TokenKind::Identifier);
        assert_eq!(classify("r10"), TokenKind::Identifier);
        assert_eq!(classify("2x"), TokenKind::Unknown);
        assert_eq!(classify("-x"), TokenKind::Unknown);
    }

    #[test]
    fn test_classify_punctuation() {
        assert_eq!(classify("."), TokenKind::Dot);
        assert_eq!(classify(","), TokenKind::Comma);
        assert_eq!(classify(":"), TokenKind::Colon);
        assert_eq!(classify("#"), TokenKind::Hash);
    }

    #[test]
    fn test_operator_table_is_in_opcode_order() {
        for (index, descriptor) in OPS.iter().enumerate() {
            assert_eq!(descriptor.op as usize, index);
        }
    }

    #[test]
    fn test_lea_rejects_immediate_and_register_sources() {
        let lea = Opcode::Lea.descriptor();
        assert!(!lea.src_modes[AddressingMode::Immediate as usize]);
        assert!(lea.src_modes[AddressingMode::Direct as usize]);
        assert!(lea.src_modes[AddressingMode::Struct as usize]);
        assert!(!lea.src_modes[AddressingMode::Register as usize]);
    }

    #[test]
    fn test_prn_is_the_only_single_operand_immediate_target() {
        for descriptor in OPS.iter().filter(|d| d.operands == 1) {
            let allows_immediate = descriptor.dst_modes[AddressingMode::Immediate as usize];
            assert_eq!(allows_immediate, descriptor.op == Opcode::Prn);
        }
    }
}
