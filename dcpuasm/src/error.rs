use thiserror::Error;

use crate::token::Span;

/// Broad category of an assembly error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Lexical,
    Syntactic,
    Semantic,
    Internal,
    Resource,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Label is of zero length")]
    EmptyLabel,
    #[error("Invalid label '{0}': labels start with a letter and contain only letters and digits")]
    InvalidLabel(String),
    #[error("Unexpected end of file after string start")]
    UnterminatedString,
    #[error("Invalid {radix} number '{text}'")]
    InvalidNumber { radix: &'static str, text: String },
    #[error("Literal '{0}' does not fit in a 16-bit word")]
    LiteralOutOfRange(String),
    #[error("Unknown token '{0}'")]
    UnknownToken(String),

    #[error("Unexpected end of file while searching for {0}")]
    UnexpectedEof(&'static str),
    #[error("Unexpected new line while searching for {0}")]
    UnexpectedNewline(&'static str),
    #[error("Unexpected character '{found}' while searching for {expected}")]
    UnexpectedChar { expected: &'static str, found: char },
    #[error("No {which} operand found for {mnemonic}")]
    MissingOperand {
        mnemonic: String,
        which: &'static str,
    },
    #[error("No comma after first operand of {0}")]
    MissingComma(String),
    #[error("Expected a string literal after DAT")]
    ExpectedString,
    #[error("Malformed indirect operand '{0}'")]
    MalformedIndirect(String),

    #[error("Found duplicate label '{name}', first defined at ({row}:{col})")]
    DuplicateLabel { name: String, row: usize, col: usize },
    #[error("Label '{0}' does not match any label pointer")]
    UndefinedLabel(String),
    #[error("Program does not fit in the 16-bit address space")]
    ProgramTooLarge,

    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Out of memory while {0}")]
    OutOfMemory(&'static str),
}

impl ErrorKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorKind::EmptyLabel
            | ErrorKind::InvalidLabel(_)
            | ErrorKind::UnterminatedString
            | ErrorKind::InvalidNumber { .. }
            | ErrorKind::LiteralOutOfRange(_)
            | ErrorKind::UnknownToken(_) => ErrorClass::Lexical,
            ErrorKind::UnexpectedEof(_)
            | ErrorKind::UnexpectedNewline(_)
            | ErrorKind::UnexpectedChar { .. }
            | ErrorKind::MissingOperand { .. }
            | ErrorKind::MissingComma(_)
            | ErrorKind::ExpectedString
            | ErrorKind::MalformedIndirect(_) => ErrorClass::Syntactic,
            ErrorKind::DuplicateLabel { .. }
            | ErrorKind::UndefinedLabel(_)
            | ErrorKind::ProgramTooLarge => ErrorClass::Semantic,
            ErrorKind::Internal(_) => ErrorClass::Internal,
            ErrorKind::OutOfMemory(_) => ErrorClass::Resource,
        }
    }
}

/// A fatal assembly error, pinned to a 1-based row and column of the named source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{file}:{row}:{col} {kind}")]
pub struct AsmError {
    pub file: String,
    pub row: usize,
    pub col: usize,
    pub kind: ErrorKind,
}

impl AsmError {
    pub fn at(file: &str, span: Span, kind: ErrorKind) -> Self {
        Self {
            file: file.to_owned(),
            row: span.row + 1,
            col: span.col + 1,
            kind,
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

/// An error located in the source but not yet attributed to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub span: Span,
    pub kind: ErrorKind,
}

impl Located {
    pub fn new(span: Span, kind: ErrorKind) -> Self {
        Self { span, kind }
    }

    pub fn in_file(self, file: &str) -> AsmError {
        AsmError::at(file, self.span, self.kind)
    }
}

pub type Result<T, E = AsmError> = std::result::Result<T, E>;

/// Reserve room for one more element, reporting allocator failure as an error.
pub(crate) fn reserve_one<T>(items: &mut Vec<T>, what: &'static str) -> Result<(), ErrorKind> {
    items
        .try_reserve(1)
        .map_err(|_| ErrorKind::OutOfMemory(what))
}
