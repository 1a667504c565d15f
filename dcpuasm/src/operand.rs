//! Addressing-mode matchers.
//!
//! Each matcher either recognizes its form at the cursor and leaves the cursor
//! just past it, reports `Ok(None)` when the form does not apply, or fails with
//! a located error when the form clearly applies but is malformed. Callers
//! reset the cursor after `Ok(None)`.

use libdcpu::{
    operand::{
        INDIRECT_OFFSET_STACK_REGISTERS, INDIRECT_STACK_REGISTERS, NEXT_WORD, NEXT_WORD_INDIRECT,
        PICK, STACK_REGISTERS,
    },
    AddressingMode, Register,
};
use strum::IntoEnumIterator;

use crate::{
    constants::{
        label_regex, parse_literal, INDIRECT_END, INDIRECT_MID, INLINE_WS, WORD_END,
    },
    cursor::Cursor,
    error::{ErrorKind, Located},
    token::{Operand, Span},
};

pub type Scan<T> = Result<Option<T>, Located>;

/// A recognized operand: either an addressing-mode operand or a label reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Operand(Operand),
    Label(String),
}

type Matcher = fn(&mut Cursor<'_>) -> Scan<Operand>;

// Most specific first, so that a shorter form never shadows a longer one.
const CANDIDATES: &[Matcher] = &[
    indirect_register_literal,
    indirect_register,
    indirect_literal,
    register_literal,
    register,
    literal,
];

fn here(cur: &Cursor<'_>) -> Span {
    Span::new(cur.mark(), 0)
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Fail on end of input or end of line, where `expected` had to follow.
pub fn expect_more(cur: &Cursor<'_>, expected: &'static str) -> Result<(), Located> {
    match cur.peek() {
        None => Err(Located::new(here(cur), ErrorKind::UnexpectedEof(expected))),
        Some(b'\n') => Err(Located::new(
            here(cur),
            ErrorKind::UnexpectedNewline(expected),
        )),
        _ => Ok(()),
    }
}

fn skip_inline(cur: &mut Cursor<'_>) -> usize {
    cur.skip_while(|c| INLINE_WS.contains(&c))
}

/// Match one of `names` followed by a delimiter, returning its field value.
fn name<'n>(
    cur: &mut Cursor<'_>,
    names: impl IntoIterator<Item = (&'n str, u8)>,
    delims: &[u8],
) -> Option<u8> {
    let (word, field) = names
        .into_iter()
        .find(|(word, _)| cur.at_word(word, delims))?;
    cur.advance_by(word.len());
    Some(field)
}

fn number(cur: &mut Cursor<'_>, delims: &[u8]) -> Scan<i32> {
    let starts_number = match cur.peek() {
        Some(c) if c.is_ascii_digit() => true,
        Some(b'-') => cur.peek_at(1).map_or(false, |c| c.is_ascii_digit()),
        _ => false,
    };
    if !starts_number {
        return Ok(None);
    }

    let start = cur.mark();
    let digits = text(cur.take_until(delims));
    parse_literal(&digits)
        .map(Some)
        .map_err(|kind| Located::new(cur.span_from(start), kind))
}

/// Expect a closing bracket, possibly after inline whitespace.
fn close_bracket(cur: &mut Cursor<'_>) -> Result<(), Located> {
    skip_inline(cur);
    expect_more(cur, "']'")?;
    match cur.peek() {
        Some(b']') => {
            cur.advance();
            Ok(())
        }
        found => Err(Located::new(
            here(cur),
            ErrorKind::UnexpectedChar {
                expected: "']'",
                found: found.map_or(' ', char::from),
            },
        )),
    }
}

/// Consume `[` and any inline whitespace after it.
fn open_bracket(cur: &mut Cursor<'_>) -> Scan<()> {
    if cur.peek() != Some(b'[') {
        return Ok(None);
    }
    cur.advance();
    skip_inline(cur);
    expect_more(cur, "']'")?;
    Ok(Some(()))
}

fn operand(mode: AddressingMode, field: u8, literal: i32) -> Operand {
    Operand {
        mode,
        field,
        literal,
    }
}

/// `[A+n]` .. `[J+n]`, `[SP+n]`
pub fn indirect_register_literal(cur: &mut Cursor<'_>) -> Scan<Operand> {
    if open_bracket(cur)?.is_none() {
        return Ok(None);
    }

    let registers = Register::iter().map(|r| (r.name(), r.indirect_offset()));
    let names = registers.chain(INDIRECT_OFFSET_STACK_REGISTERS.iter().copied());
    let Some(field) = name(cur, names, INDIRECT_MID) else { return Ok(None); };

    skip_inline(cur);
    expect_more(cur, "']'")?;
    if cur.peek() != Some(b'+') {
        return Ok(None);
    }
    cur.advance();

    skip_inline(cur);
    expect_more(cur, "']'")?;
    // `[SP++]` gets this far too
    let Some(literal) = number(cur, INDIRECT_END)? else { return Ok(None); };

    close_bracket(cur)?;
    Ok(Some(operand(
        AddressingMode::IndirectRegisterLiteral,
        field,
        literal,
    )))
}

/// `[A]` .. `[J]`, `[SP]`, `[--SP]`, `[SP++]`
pub fn indirect_register(cur: &mut Cursor<'_>) -> Scan<Operand> {
    if open_bracket(cur)?.is_none() {
        return Ok(None);
    }

    let registers = Register::iter().map(|r| (r.name(), r.indirect()));
    let names = registers.chain(INDIRECT_STACK_REGISTERS.iter().copied());
    let Some(field) = name(cur, names, INDIRECT_END) else { return Ok(None); };

    skip_inline(cur);
    expect_more(cur, "']'")?;
    if cur.peek() != Some(b']') {
        return Ok(None);
    }
    cur.advance();

    Ok(Some(operand(AddressingMode::IndirectRegister, field, 0)))
}

/// `[n]`
pub fn indirect_literal(cur: &mut Cursor<'_>) -> Scan<Operand> {
    if open_bracket(cur)?.is_none() {
        return Ok(None);
    }

    let Some(literal) = number(cur, INDIRECT_END)? else { return Ok(None); };
    close_bracket(cur)?;

    Ok(Some(operand(
        AddressingMode::IndirectLiteral,
        NEXT_WORD_INDIRECT,
        literal,
    )))
}

/// `PICK n`
pub fn register_literal(cur: &mut Cursor<'_>) -> Scan<Operand> {
    if !cur.at_word("PICK", WORD_END) {
        return Ok(None);
    }
    cur.advance_by("PICK".len());

    skip_inline(cur);
    expect_more(cur, "a literal after PICK")?;
    let Some(literal) = number(cur, WORD_END)? else { return Ok(None); };

    Ok(Some(operand(AddressingMode::RegisterLiteral, PICK, literal)))
}

/// `A` .. `J`, `PUSH`, `POP`, `PEEK`, `SP`, `PC`, `EX`
pub fn register(cur: &mut Cursor<'_>) -> Scan<Operand> {
    let registers = Register::iter().map(|r| (r.name(), r.direct()));
    let names = registers.chain(STACK_REGISTERS.iter().copied());
    Ok(name(cur, names, WORD_END).map(|field| operand(AddressingMode::Register, field, 0)))
}

/// `n`
pub fn literal(cur: &mut Cursor<'_>) -> Scan<Operand> {
    Ok(number(cur, WORD_END)?.map(|literal| operand(AddressingMode::Literal, NEXT_WORD, literal)))
}

/// Try every addressing mode, then fall back to a label reference.
///
/// `Ok(None)` means there is no operand at the cursor at all.
pub fn parse_operand(cur: &mut Cursor<'_>) -> Scan<Parsed> {
    let start = cur.mark();
    for candidate in CANDIDATES {
        if let Some(operand) = candidate(cur)? {
            return Ok(Some(Parsed::Operand(operand)));
        }
        cur.reset(start);
    }

    if cur.peek() == Some(b'[') {
        let bracketed = cur.take_until(b"]\n");
        return Err(Located::new(
            cur.span_from(start),
            ErrorKind::MalformedIndirect(text(bracketed)),
        ));
    }

    let label = text(cur.take_until(WORD_END));
    if label.is_empty() {
        return Ok(None);
    }
    if !label_regex().is_match(&label) {
        return Err(Located::new(
            cur.span_from(start),
            ErrorKind::InvalidLabel(label),
        ));
    }
    Ok(Some(Parsed::Label(label)))
}
