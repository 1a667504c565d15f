use num_derive::FromPrimitive;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

pub const PUSH_POP: u8 = 0x18;
pub const PEEK: u8 = 0x19;
pub const PICK: u8 = 0x1A;
pub const SP: u8 = 0x1B;
pub const PC: u8 = 0x1C;
pub const EX: u8 = 0x1D;
pub const NEXT_WORD_INDIRECT: u8 = 0x1E;
pub const NEXT_WORD: u8 = 0x1F;

const INDIRECT: u8 = 0x08;
const INDIRECT_OFFSET: u8 = 0x10;

// Short literals are stored as value + 0x21, so -1 lands on 0x20.
const SHORT_LITERAL_BIAS: i32 = 0x21;
pub const SHORT_LITERAL_MIN: i32 = -1;
pub const SHORT_LITERAL_MAX: i32 = 30;

#[derive(
    FromPrimitive, EnumString, EnumIter, IntoStaticStr, Display, Debug, Clone, Copy, PartialEq, Eq,
)]
#[strum(ascii_case_insensitive)]
pub enum Register {
    A = 0,
    B = 1,
    C = 2,
    X = 3,
    Y = 4,
    Z = 5,
    I = 6,
    J = 7,
}

impl Register {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn direct(self) -> u8 {
        self as u8
    }

    pub fn indirect(self) -> u8 {
        INDIRECT + self as u8
    }

    pub fn indirect_offset(self) -> u8 {
        INDIRECT_OFFSET + self as u8
    }
}

/// How an operand names its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// `A`, `PUSH`, `SP`, ...
    Register,
    /// `[A]`, `[SP++]`, ...
    IndirectRegister,
    /// `[A+n]`, `[SP+n]`
    IndirectRegisterLiteral,
    /// `PICK n`
    RegisterLiteral,
    /// `[n]`
    IndirectLiteral,
    /// `n`
    Literal,
}

impl AddressingMode {
    /// Whether the mode always spends an extension word on its literal.
    pub fn carries_literal(&self) -> bool {
        matches!(
            self,
            AddressingMode::IndirectRegisterLiteral
                | AddressingMode::RegisterLiteral
                | AddressingMode::IndirectLiteral
        )
    }
}

/// Bare register names other than the general purpose registers.
pub static STACK_REGISTERS: &[(&str, u8)] = &[
    ("PUSH", PUSH_POP),
    ("POP", PUSH_POP),
    ("PEEK", PEEK),
    ("SP", SP),
    ("PC", PC),
    ("EX", EX),
];

/// Names accepted between brackets as a plain indirection.
pub static INDIRECT_STACK_REGISTERS: &[(&str, u8)] = &[
    ("SP", PEEK),
    ("--SP", PUSH_POP),
    ("SP++", PUSH_POP),
];

/// `[SP+n]` shares its field with `PICK n`.
pub static INDIRECT_OFFSET_STACK_REGISTERS: &[(&str, u8)] = &[("SP", PICK)];

pub fn fold_literal(value: i32) -> Option<u8> {
    (SHORT_LITERAL_MIN..=SHORT_LITERAL_MAX)
        .contains(&value)
        .then(|| (value + SHORT_LITERAL_BIAS) as u8)
}

pub fn unfold_literal(field: u8) -> Option<i32> {
    let value = field as i32 - SHORT_LITERAL_BIAS;
    (SHORT_LITERAL_MIN..=SHORT_LITERAL_MAX)
        .contains(&value)
        .then_some(value)
}
