use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::ErrorKind;

pub const INLINE_WS: &[u8] = b" \t\r";
pub const ALL_WS: &[u8] = b" \t\r\n";
pub const COMMENT: u8 = b';';

/// What may follow a mnemonic, an operand or a label reference.
pub const WORD_END: &[u8] = b" \t\r\n,;";
/// What may follow a label definition.
pub const LABEL_END: &[u8] = b" \t\r\n;";
/// What may follow the register in `[R+n]`.
pub const INDIRECT_MID: &[u8] = b" \t\r\n+]";
/// What may follow the last term between brackets.
pub const INDIRECT_END: &[u8] = b" \t\r\n]";

/// Smallest and largest literal that fits in a 16-bit word, signed or not.
pub const LITERAL_MIN: i64 = -0x8000;
pub const LITERAL_MAX: i64 = 0xFFFF;

pub static LABEL_REGEX: OnceCell<Regex> = OnceCell::new();
pub static HEX_REGEX: OnceCell<Regex> = OnceCell::new();
pub static OCTAL_REGEX: OnceCell<Regex> = OnceCell::new();
pub static DECIMAL_REGEX: OnceCell<Regex> = OnceCell::new();

pub fn label_regex() -> &'static Regex {
    LABEL_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("Invalid label regex"))
}

fn hex_regex() -> &'static Regex {
    HEX_REGEX.get_or_init(|| Regex::new(r"^0[xX](?P<digits>[0-9A-Fa-f]+)$").expect("Invalid hex regex"))
}

fn octal_regex() -> &'static Regex {
    OCTAL_REGEX.get_or_init(|| Regex::new(r"^0(?P<digits>[0-7]+)$").expect("Invalid octal regex"))
}

fn decimal_regex() -> &'static Regex {
    DECIMAL_REGEX.get_or_init(|| Regex::new(r"^(?P<digits>[0-9]+)$").expect("Invalid decimal regex"))
}

/// Parse a numeric literal: `0x` hex, leading-zero octal or decimal, with an
/// optional leading minus sign.
pub fn parse_literal(text: &str) -> Result<i32, ErrorKind> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let bytes = unsigned.as_bytes();
    let (radix, name, regex) = match bytes {
        [b'0', b'x' | b'X', ..] => (16, "hexadecimal", hex_regex()),
        [b'0', d, ..] if d.is_ascii_digit() => (8, "octal", octal_regex()),
        _ => (10, "decimal", decimal_regex()),
    };

    let digits = regex
        .captures(unsigned)
        .and_then(|cap| cap.name("digits"))
        .ok_or_else(|| ErrorKind::InvalidNumber {
            radix: name,
            text: text.to_owned(),
        })?;

    // Only overflow is left once the regex has matched.
    let value = i64::from_str_radix(digits.as_str(), radix)
        .map_err(|_| ErrorKind::LiteralOutOfRange(text.to_owned()))?;
    let value = if negative { -value } else { value };

    if !(LITERAL_MIN..=LITERAL_MAX).contains(&value) {
        return Err(ErrorKind::LiteralOutOfRange(text.to_owned()));
    }

    Ok(value as i32)
}
