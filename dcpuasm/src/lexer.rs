use libdcpu::Op;
use log::debug;

use crate::{
    constants::{label_regex, ALL_WS, COMMENT, INLINE_WS, LABEL_END, WORD_END},
    cursor::Cursor,
    error::{ErrorKind, Located, Result},
    labels::Labels,
    operand::{expect_more, parse_operand, Parsed},
    token::{Span, Token, TokenId, TokenKind, Tokens},
};

/// A tokenized compilation unit.
#[derive(Debug)]
pub struct Unit {
    pub file: String,
    pub source: String,
    pub tokens: Tokens,
    pub labels: Labels,
}

struct Lexer<'a> {
    cur: Cursor<'a>,
    tokens: Tokens,
    labels: Labels,
}

/// Turn source text into a token stream, registering every label on the way.
pub fn tokenize(file: &str, source: &str) -> Result<Unit> {
    let mut lexer = Lexer {
        cur: Cursor::new(source),
        tokens: Tokens::new(),
        labels: Labels::new(),
    };
    lexer.run().map_err(|e| e.in_file(file))?;

    debug!(
        "{}: {} tokens, {} label pointers, {} label operands",
        file,
        lexer.tokens.len(),
        lexer.labels.pointers().count(),
        lexer.labels.operands().count()
    );

    Ok(Unit {
        file: file.to_owned(),
        source: source.to_owned(),
        tokens: lexer.tokens,
        labels: lexer.labels,
    })
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<(), Located> {
        loop {
            self.skip_whitespace_and_comments();
            if self.cur.is_eof() {
                return Ok(());
            }

            if self.label_definition()? || self.data()? || self.instruction()? {
                continue;
            }

            let start = self.cur.mark();
            let word = text(self.cur.take_until(LABEL_END));
            return Err(Located::new(
                self.cur.span_from(start),
                ErrorKind::UnknownToken(word),
            ));
        }
    }

    fn here(&self) -> Span {
        Span::new(self.cur.mark(), 0)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let ws = self.cur.skip_while(|c| ALL_WS.contains(&c));
            let comment = if self.cur.peek() == Some(COMMENT) {
                self.cur.skip_while(|c| c != b'\n')
            } else {
                0
            };
            if ws == 0 && comment == 0 {
                break;
            }
        }
    }

    fn skip_inline_whitespace(&mut self) {
        self.cur.skip_while(|c| INLINE_WS.contains(&c));
    }

    fn emit(&mut self, token: Token) -> Result<TokenId, Located> {
        let span = token.span;
        self.tokens.push(token).map_err(|kind| Located::new(span, kind))
    }

    /// `:name`
    fn label_definition(&mut self) -> Result<bool, Located> {
        if self.cur.peek() != Some(b':') {
            return Ok(false);
        }
        let start = self.cur.mark();
        self.cur.advance();

        let name = text(self.cur.take_until(LABEL_END));
        let span = self.cur.span_from(start);
        if name.is_empty() {
            return Err(Located::new(span, ErrorKind::EmptyLabel));
        }
        if !label_regex().is_match(&name) {
            return Err(Located::new(span, ErrorKind::InvalidLabel(name)));
        }

        let id = self
            .labels
            .define(&name, span)
            .map_err(|kind| Located::new(span, kind))?;
        self.emit(Token {
            span,
            kind: TokenKind::Label(id),
        })?;
        Ok(true)
    }

    /// `DAT "string"`
    fn data(&mut self) -> Result<bool, Located> {
        if !self.cur.at_word("DAT", WORD_END) {
            return Ok(false);
        }
        let start = self.cur.mark();
        self.cur.advance_by("DAT".len());

        self.skip_inline_whitespace();
        expect_more(&self.cur, "data")?;
        if self.cur.peek() != Some(b'"') {
            return Err(Located::new(self.here(), ErrorKind::ExpectedString));
        }
        let quote = self.cur.mark();
        self.cur.advance();

        let payload_start = self.cur.mark();
        loop {
            match self.cur.peek() {
                None => {
                    return Err(Located::new(
                        Span::new(quote, 1),
                        ErrorKind::UnterminatedString,
                    ))
                }
                // A backslash keeps the quote in the string.
                Some(b'"') if self.cur.since(payload_start).last() != Some(&b'\\') => break,
                Some(_) => self.cur.advance(),
            }
        }
        let payload = self.cur.since(payload_start).to_vec();
        self.cur.advance();

        self.emit(Token {
            span: self.cur.span_from(start),
            kind: TokenKind::Data(payload),
        })?;
        Ok(true)
    }

    /// A basic opcode with two operands or a special opcode with one.
    fn instruction(&mut self) -> Result<bool, Located> {
        let start = self.cur.mark();
        let mnemonic = text(self.cur.take_until(WORD_END));
        let Some(op) = Op::from_mnemonic(&mnemonic) else {
            self.cur.reset(start);
            return Ok(false);
        };
        let span = self.cur.span_from(start);

        let kind = match op {
            Op::Basic(op) => {
                self.skip_inline_whitespace();
                expect_more(&self.cur, "an operand")?;
                let b = self.operand(&mnemonic, "first")?;

                self.skip_inline_whitespace();
                expect_more(&self.cur, "','")?;
                if self.cur.peek() != Some(b',') {
                    return Err(Located::new(
                        self.here(),
                        ErrorKind::MissingComma(mnemonic),
                    ));
                }
                self.cur.advance();

                self.skip_inline_whitespace();
                expect_more(&self.cur, "an operand")?;
                let a = self.operand(&mnemonic, "second")?;

                TokenKind::BasicOpcode { op, b, a }
            }
            Op::Special(op) => {
                self.skip_inline_whitespace();
                expect_more(&self.cur, "an operand")?;
                let a = self.operand(&mnemonic, "first")?;

                TokenKind::SpecialOpcode { op, a }
            }
        };

        self.emit(Token { span, kind })?;
        Ok(true)
    }

    fn operand(&mut self, mnemonic: &str, which: &'static str) -> Result<TokenId, Located> {
        let start = self.cur.mark();
        let kind = match parse_operand(&mut self.cur)? {
            Some(Parsed::Operand(operand)) => TokenKind::Operand(operand),
            Some(Parsed::Label(name)) => {
                let span = self.cur.span_from(start);
                let id = self
                    .labels
                    .reference(&name, span)
                    .map_err(|kind| Located::new(span, kind))?;
                TokenKind::Label(id)
            }
            None => {
                return Err(Located::new(
                    self.here(),
                    ErrorKind::MissingOperand {
                        mnemonic: mnemonic.to_owned(),
                        which,
                    },
                ))
            }
        };

        let span = self.cur.span_from(start);
        self.tokens
            .add(Token { span, kind })
            .map_err(|kind| Located::new(span, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{OperandState, PointerState, Role};
    use libdcpu::{AddressingMode, BasicOp, SpecialOp};

    fn kinds(unit: &Unit) -> Vec<TokenKind> {
        unit.tokens.program().map(|t| t.kind.clone()).collect()
    }

    fn error(source: &str) -> crate::error::AsmError {
        tokenize("test.dasm", source).unwrap_err()
    }

    #[test]
    fn program_order() {
        let unit = tokenize(
            "test.dasm",
            ":start\n  set a, 5 ; load\n  JSR start\n  DAT \"hi\"\n",
        )
        .unwrap();
        let kinds = kinds(&unit);
        assert_eq!(kinds.len(), 4);
        assert!(matches!(kinds[0], TokenKind::Label(_)));
        assert!(matches!(
            kinds[1],
            TokenKind::BasicOpcode {
                op: BasicOp::SET,
                ..
            }
        ));
        assert!(matches!(
            kinds[2],
            TokenKind::SpecialOpcode {
                op: SpecialOp::JSR,
                ..
            }
        ));
        assert_eq!(kinds[3], TokenKind::Data(b"hi".to_vec()));

        assert_eq!(unit.labels.pointers().count(), 1);
        assert_eq!(unit.labels.operands().count(), 1);
    }

    #[test]
    fn operand_chain() {
        let unit = tokenize("test.dasm", "ADD [A+2], loop").unwrap();
        let opcode = unit.tokens.program().next().unwrap();
        let TokenKind::BasicOpcode { b, a, .. } = opcode.kind else {
            panic!("expected a basic opcode");
        };

        let b = unit.tokens.get(b);
        assert_eq!(b.span.col, 4);
        assert_eq!(b.span.len, 5);
        let TokenKind::Operand(operand) = b.kind else {
            panic!("expected an operand");
        };
        assert_eq!(operand.mode, AddressingMode::IndirectRegisterLiteral);
        assert_eq!(operand.literal, 2);

        let TokenKind::Label(id) = unit.tokens.get(a).kind else {
            panic!("expected a label operand");
        };
        let label = unit.labels.get(id);
        assert_eq!(label.name, "loop");
        assert_eq!(label.role, Role::Operand(OperandState::Unresolved));
    }

    #[test]
    fn label_pointer_span() {
        let unit = tokenize("test.dasm", "\n   :loop SET PC, loop").unwrap();
        let label = unit.labels.pointer("loop").unwrap();
        assert_eq!((label.span.row, label.span.col, label.span.len), (1, 3, 5));
        assert_eq!(label.role, Role::Pointer(PointerState::Unresolved));
    }

    #[test]
    fn escaped_quote_stays_in_data() {
        let unit = tokenize("test.dasm", r#"dat "a\"b""#).unwrap();
        assert_eq!(kinds(&unit), vec![TokenKind::Data(br#"a\"b"#.to_vec())]);
    }

    #[test]
    fn mnemonic_needs_delimiter() {
        let err = error("ADDX A, B");
        assert_eq!(err.kind, ErrorKind::UnknownToken("ADDX".into()));
        assert_eq!((err.row, err.col), (1, 1));
    }

    #[test]
    fn invalid_labels() {
        assert_eq!(error(":").kind, ErrorKind::EmptyLabel);
        assert_eq!(error(":1abc").kind, ErrorKind::InvalidLabel("1abc".into()));
        assert_eq!(error(":ab-c").kind, ErrorKind::InvalidLabel("ab-c".into()));
    }

    #[test]
    fn duplicate_label() {
        let err = error(":here SET A, 1\n:here SET A, 2");
        assert_eq!(
            err.kind,
            ErrorKind::DuplicateLabel {
                name: "here".into(),
                row: 1,
                col: 1
            }
        );
        assert_eq!((err.row, err.col), (2, 1));
    }

    #[test]
    fn syntax_errors() {
        let err = error("SET A");
        assert_eq!(err.kind, ErrorKind::UnexpectedEof("','"));

        let err = error("SET A B");
        assert_eq!(err.kind, ErrorKind::MissingComma("SET".into()));
        assert_eq!((err.row, err.col), (1, 7));

        let err = error("SET\nA, B");
        assert_eq!(err.kind, ErrorKind::UnexpectedNewline("an operand"));

        let err = error("SET A, ; nothing");
        assert_eq!(
            err.kind,
            ErrorKind::MissingOperand {
                mnemonic: "SET".into(),
                which: "second"
            }
        );

        let err = error("JSR");
        assert_eq!(err.kind, ErrorKind::UnexpectedEof("an operand"));
    }

    #[test]
    fn data_errors() {
        let err = error("DAT \"open");
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        assert_eq!((err.row, err.col), (1, 5));

        assert_eq!(error("DAT 5").kind, ErrorKind::ExpectedString);
        assert_eq!(error("DAT\n\"x\"").kind, ErrorKind::UnexpectedNewline("data"));
    }

    #[test]
    fn errors_carry_file() {
        let err = error("\n\n  bogus");
        assert_eq!(err.file, "test.dasm");
        assert_eq!((err.row, err.col), (3, 3));
        assert_eq!(err.to_string(), "test.dasm:3:3 Unknown token 'bogus'");
    }
}
