use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

pub const OPCODE_MASK: u16 = 0x1F;
pub const B_SHIFT: u16 = 5;
pub const A_SHIFT: u16 = 10;

/// Widest value the 5 bit `b` field can hold.
pub const B_MAX: u8 = 0x1F;
/// Widest value the 6 bit `a` field can hold.
pub const A_MAX: u8 = 0x3F;

#[allow(clippy::upper_case_acronyms)]
#[derive(FromPrimitive, EnumString, EnumIter, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum BasicOp {
    SET = 0x01,
    ADD = 0x02,
    SUB = 0x03,
    MUL = 0x04,
    MLI = 0x05,
    DIV = 0x06,
    DVI = 0x07,
    MOD = 0x08,
    MDI = 0x09,
    AND = 0x0A,
    BOR = 0x0B,
    XOR = 0x0C,
    SHR = 0x0D,
    ASR = 0x0E,
    SHL = 0x0F,

    IFB = 0x10,
    IFC = 0x11,
    IFE = 0x12,
    IFN = 0x13,
    IFG = 0x14,
    IFA = 0x15,
    IFL = 0x16,
    IFU = 0x17,

    ADX = 0x1A,
    SBX = 0x1B,

    STI = 0x1E,
    STD = 0x1F,
}

#[allow(clippy::upper_case_acronyms)]
#[derive(FromPrimitive, EnumString, EnumIter, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum SpecialOp {
    JSR = 0x01,

    INT = 0x08,
    IAG = 0x09,
    IAS = 0x0A,
    RFI = 0x0B,
    IAQ = 0x0C,

    HWN = 0x10,
    HWQ = 0x11,
    HWI = 0x12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Basic(BasicOp),
    Special(SpecialOp),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    #[error("operand field b does not fit in 5 bits: {0:#04x}")]
    B(u8),
    #[error("operand field a does not fit in 6 bits: {0:#04x}")]
    A(u8),
}

/// The three bit fields of a packed instruction word.
///
/// For a special instruction `code` is zero and `b` holds the special opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    pub code: u8,
    pub b: u8,
    pub a: u8,
}

pub fn fields(word: u16) -> Fields {
    Fields {
        code: (word & OPCODE_MASK) as u8,
        b: ((word >> B_SHIFT) & B_MAX as u16) as u8,
        a: ((word >> A_SHIFT) & A_MAX as u16) as u8,
    }
}

fn check(b: u8, a: u8) -> Result<(), FieldError> {
    if b > B_MAX {
        return Err(FieldError::B(b));
    }
    if a > A_MAX {
        return Err(FieldError::A(a));
    }
    Ok(())
}

/// Packs `op b, a` as `aaaaaabbbbbooooo`.
pub fn pack_basic(op: BasicOp, b: u8, a: u8) -> Result<u16, FieldError> {
    check(b, a)?;
    Ok(op as u16 | (b as u16) << B_SHIFT | (a as u16) << A_SHIFT)
}

/// Packs `op a` as `aaaaaaooooo00000`.
pub fn pack_special(op: SpecialOp, a: u8) -> Result<u16, FieldError> {
    check(op as u8, a)?;
    Ok((op as u16) << B_SHIFT | (a as u16) << A_SHIFT)
}

impl Op {
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        if let Ok(basic) = mnemonic.parse::<BasicOp>() {
            Some(Self::Basic(basic))
        } else if let Ok(special) = mnemonic.parse::<SpecialOp>() {
            Some(Self::Special(special))
        } else {
            None
        }
    }

    pub fn from_word(word: u16) -> Option<Self> {
        let Fields { code, b, .. } = fields(word);
        if code == 0 {
            return SpecialOp::from_u8(b).map(Self::Special);
        }
        BasicOp::from_u8(code).map(Self::Basic)
    }

    pub fn operand_count(&self) -> usize {
        match self {
            Op::Basic(_) => 2,
            Op::Special(_) => 1,
        }
    }
}
