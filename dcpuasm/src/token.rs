use libdcpu::{AddressingMode, BasicOp, SpecialOp};

use crate::{
    cursor::Position,
    error::{reserve_one, ErrorKind},
    labels::LabelId,
};

/// Location of a token in the source. Rows and columns are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: usize,
    pub row: usize,
    pub col: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: Position, len: usize) -> Self {
        Self {
            offset: start.offset,
            row: start.row,
            col: start.col,
            len,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub mode: AddressingMode,
    pub field: u8,
    pub literal: i32,
}

/// Index of a token in its [`Tokens`] stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A label definition, or a label used as an operand.
    Label(LabelId),
    BasicOpcode {
        op: BasicOp,
        b: TokenId,
        a: TokenId,
    },
    SpecialOpcode {
        op: SpecialOp,
        a: TokenId,
    },
    Operand(Operand),
    Data(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub span: Span,
    pub kind: TokenKind,
}

/// Every token of a compilation unit. Operand tokens live here too, but only
/// opcode tokens refer to them; `program` lists the top level in source order.
#[derive(Debug, Default)]
pub struct Tokens {
    tokens: Vec<Token>,
    program: Vec<TokenId>,
}

impl Tokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token that only an opcode refers to.
    pub fn add(&mut self, token: Token) -> Result<TokenId, ErrorKind> {
        reserve_one(&mut self.tokens, "storing a token")?;
        self.tokens.push(token);
        Ok(TokenId(self.tokens.len() - 1))
    }

    /// Store a token and append it to the program.
    pub fn push(&mut self, token: Token) -> Result<TokenId, ErrorKind> {
        let id = self.add(token)?;
        reserve_one(&mut self.program, "extending the token stream")?;
        self.program.push(id);
        Ok(id)
    }

    pub fn get(&self, id: TokenId) -> &Token {
        &self.tokens[id.0]
    }

    pub fn program(&self) -> impl Iterator<Item = &Token> + '_ {
        self.program.iter().map(|&id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.program.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }
}
