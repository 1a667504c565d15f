use crate::token::Span;

/// A saved cursor location. Rows and columns are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub row: usize,
    pub col: usize,
}

/// Byte cursor over a source buffer that tracks row and column as it moves.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    input: &'a [u8],
    pos: Position,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: Position::default(),
        }
    }

    pub fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    pub fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.pos.offset + ahead).copied()
    }

    pub fn is_eof(&self) -> bool {
        self.pos.offset >= self.input.len()
    }

    /// Consume one byte. Does nothing at end of input.
    pub fn advance(&mut self) {
        let Some(c) = self.peek() else { return; };
        if c == b'\n' {
            self.pos.row += 1;
            self.pos.col = 0;
        } else {
            self.pos.col += 1;
        }
        self.pos.offset += 1;
    }

    pub fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    pub fn mark(&self) -> Position {
        self.pos
    }

    pub fn reset(&mut self, pos: Position) {
        self.pos = pos;
    }

    /// Unconsumed input.
    pub fn rest(&self) -> &'a [u8] {
        &self.input[self.pos.offset.min(self.input.len())..]
    }

    /// The bytes between `start` and the current location.
    pub fn since(&self, start: Position) -> &'a [u8] {
        &self.input[start.offset..self.pos.offset]
    }

    pub fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.pos.offset - start.offset)
    }

    /// Consume bytes for as long as `pred` holds, returning how many were taken.
    pub fn skip_while(&mut self, pred: impl Fn(u8) -> bool) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.advance();
            count += 1;
        }
        count
    }

    /// Consume up to (not including) the first byte in `delims`.
    pub fn take_until(&mut self, delims: &[u8]) -> &'a [u8] {
        let start = self.mark();
        self.skip_while(|c| !delims.contains(&c));
        self.since(start)
    }

    /// Whether the input continues with `word` (ignoring ASCII case) followed by
    /// one of `delims` or the end of input.
    pub fn at_word(&self, word: &str, delims: &[u8]) -> bool {
        let rest = self.rest();
        let n = word.len();
        rest.len() >= n
            && rest[..n].eq_ignore_ascii_case(word.as_bytes())
            && rest.get(n).map_or(true, |c| delims.contains(c))
    }
}
