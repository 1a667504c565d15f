use std::mem;

use dcpudbg::Sdb;
use libdcpu::{
    op::{pack_basic, pack_special},
    operand::{fold_literal, NEXT_WORD},
    AddressingMode,
};
use log::{debug, trace};

use crate::{
    error::{ErrorKind, Located, Result},
    labels::{LabelId, Labels, OperandState, PointerState, Role},
    lexer::Unit,
    record::{BinaryCode, Instruction, Record, Slot},
    token::{Operand, Token, TokenId, TokenKind, Tokens},
};

/// Bytes addressable by a 16-bit word index.
pub const MEMORY_BYTES: usize = 0x1_0000 * 2;

/// Where an operand's field goes in the opcode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// The 6-bit field, which can hold a short literal.
    A,
    /// The 5-bit field.
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extension {
    None,
    Word(u16),
    Placeholder(LabelId),
}

pub struct FirstPass {
    cur_offset: usize,
    unit: Unit,
    code: BinaryCode,
    debug: Sdb,
    line_starts: Vec<usize>,
}

pub struct PassOne {
    pub file: String,
    pub labels: Labels,
    pub code: BinaryCode,
    pub debug: Sdb,
}

/// Word index of a byte offset, or an error when it lies outside memory.
pub fn word_index(offset: usize) -> Result<u16, ErrorKind> {
    u16::try_from(offset / 2).map_err(|_| ErrorKind::ProgramTooLarge)
}

impl FirstPass {
    fn new(unit: Unit) -> Self {
        let line_starts = std::iter::once(0)
            .chain(unit.source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let debug = Sdb::new(&unit.file);

        Self {
            cur_offset: 0,
            unit,
            code: BinaryCode::new(),
            debug,
            line_starts,
        }
    }

    /// Walk the program, laying out records and resolving label pointers.
    pub fn lay_out(unit: Unit) -> Result<PassOne> {
        let mut pass = Self::new(unit);
        let file = pass.unit.file.clone();
        pass.run().map_err(|e| e.in_file(&file))?;
        Ok(pass.into_pass_one())
    }

    fn run(&mut self) -> Result<(), Located> {
        let tokens = mem::take(&mut self.unit.tokens);
        for token in tokens.program() {
            self.lay_out_token(&tokens, token)?;
        }
        self.unit.tokens = tokens;

        let unresolved = self
            .unit
            .labels
            .pointers()
            .find(|label| label.role == Role::Pointer(PointerState::Unresolved));
        if let Some(label) = unresolved {
            return Err(Located::new(
                label.span,
                ErrorKind::Internal(format!("label pointer '{}' was never laid out", label.name)),
            ));
        }
        Ok(())
    }

    fn into_pass_one(self) -> PassOne {
        debug!(
            "{}: pass one laid out {} records in {} bytes",
            self.unit.file,
            self.code.records().len(),
            self.cur_offset
        );
        PassOne {
            file: self.unit.file,
            labels: self.unit.labels,
            code: self.code,
            debug: self.debug,
        }
    }

    fn lay_out_token(&mut self, tokens: &Tokens, token: &Token) -> Result<(), Located> {
        let at = |kind| Located::new(token.span, kind);

        match &token.kind {
            TokenKind::Label(id) => {
                let word = word_index(self.cur_offset).map_err(at)?;
                self.unit
                    .labels
                    .resolve_pointer(*id, self.cur_offset)
                    .map_err(at)?;
                let name = self.unit.labels.get(*id).name.clone();
                trace!("label pointer {} at {:0>4X}", name, word);
                self.debug.add_label(name, word);
            }
            TokenKind::BasicOpcode { .. } | TokenKind::SpecialOpcode { .. } => {
                let (instruction, placeholders) = self.encode(tokens, token)?;
                let record = self.push_record(token, Record::Instruction(instruction))?;
                for (id, word) in placeholders {
                    self.unit
                        .labels
                        .set_operand_state(id, OperandState::Pending(Slot { record, word }))
                        .map_err(at)?;
                }
            }
            TokenKind::Data(bytes) => {
                let words = bytes.iter().map(|&b| u16::from(b)).collect();
                self.push_record(token, Record::Data(words))?;
            }
            TokenKind::Operand(_) => {
                return Err(at(ErrorKind::Internal(
                    "operand token outside of an instruction".into(),
                )))
            }
        }
        Ok(())
    }

    fn push_record(&mut self, token: &Token, record: Record) -> Result<usize, Located> {
        let at = |kind| Located::new(token.span, kind);

        let start = word_index(self.cur_offset).map_err(at)?;
        let size = record.len();
        trace!("{:0>4X}: {:?}", start, record.words());

        let index = self.code.push(record).map_err(at)?;
        self.cur_offset += size;
        if self.cur_offset > MEMORY_BYTES {
            return Err(at(ErrorKind::ProgramTooLarge));
        }
        let words = u32::try_from(size / 2).map_err(|_| at(ErrorKind::ProgramTooLarge))?;

        let text = self.source_line(token.span.row).to_owned();
        self.debug.add_line(start, words, text, token.span.row + 1);
        Ok(index)
    }

    fn source_line(&self, row: usize) -> &str {
        let start = self.line_starts.get(row).copied().unwrap_or(0);
        let end = self
            .line_starts
            .get(row + 1)
            .copied()
            .unwrap_or(self.unit.source.len());
        self.unit.source[start..end].trim()
    }

    /// Build the opcode word and its extension words. The `a` operand's
    /// extension word comes first.
    fn encode(
        &mut self,
        tokens: &Tokens,
        token: &Token,
    ) -> Result<(Instruction, Vec<(LabelId, usize)>), Located> {
        let at = |kind| Located::new(token.span, kind);

        let (opcode, extensions) = match token.kind {
            TokenKind::BasicOpcode { op, b, a } => {
                let (a, a_ext) = self.encode_operand(tokens, a, Position::A)?;
                let (b, b_ext) = self.encode_operand(tokens, b, Position::B)?;
                let opcode =
                    pack_basic(op, b, a).map_err(|e| at(ErrorKind::Internal(e.to_string())))?;
                (opcode, [a_ext, b_ext])
            }
            TokenKind::SpecialOpcode { op, a } => {
                let (a, a_ext) = self.encode_operand(tokens, a, Position::A)?;
                let opcode =
                    pack_special(op, a).map_err(|e| at(ErrorKind::Internal(e.to_string())))?;
                (opcode, [a_ext, Extension::None])
            }
            _ => {
                return Err(at(ErrorKind::Internal(
                    "expected an opcode token".into(),
                )))
            }
        };

        let mut instruction = Instruction::new(opcode);
        let mut placeholders = Vec::new();
        for extension in extensions {
            match extension {
                Extension::None => {}
                Extension::Word(word) => {
                    instruction.extend(word).map_err(at)?;
                }
                Extension::Placeholder(id) => {
                    let word = instruction.extend(0).map_err(at)?;
                    placeholders.push((id, word));
                }
            }
        }
        Ok((instruction, placeholders))
    }

    fn encode_operand(
        &mut self,
        tokens: &Tokens,
        id: TokenId,
        position: Position,
    ) -> Result<(u8, Extension), Located> {
        let token = tokens.get(id);
        let at = |kind| Located::new(token.span, kind);

        match token.kind {
            TokenKind::Operand(operand) => Ok(encode_literal_operand(operand, position)),
            TokenKind::Label(label) => self.encode_label(label, position).map_err(at),
            _ => Err(at(ErrorKind::Internal(
                "opcode refers to a token that is not an operand".into(),
            ))),
        }
    }

    /// A label already laid out becomes its word index, folded into `a` when it
    /// is small enough. Any other label gets a placeholder word.
    fn encode_label(&mut self, id: LabelId, position: Position) -> Result<(u8, Extension), ErrorKind> {
        let label = self.unit.labels.get(id);
        if label.role != Role::Operand(OperandState::Unresolved) {
            return Err(ErrorKind::Internal(format!(
                "label operand '{}' was encoded twice",
                label.name
            )));
        }

        let Some(offset) = self.unit.labels.offset(&label.name) else {
            trace!("label operand {} is a forward reference", label.name);
            return Ok((NEXT_WORD, Extension::Placeholder(id)));
        };

        let word = word_index(offset)?;
        self.unit
            .labels
            .set_operand_state(id, OperandState::Resolved)?;
        Ok(match position {
            Position::A => match fold_literal(i32::from(word)) {
                Some(field) => (field, Extension::None),
                None => (NEXT_WORD, Extension::Word(word)),
            },
            Position::B => (NEXT_WORD, Extension::Word(word)),
        })
    }
}

fn encode_literal_operand(operand: Operand, position: Position) -> (u8, Extension) {
    match operand.mode {
        AddressingMode::Literal => match (position, fold_literal(operand.literal)) {
            (Position::A, Some(field)) => (field, Extension::None),
            _ => (NEXT_WORD, Extension::Word(operand.literal as u16)),
        },
        mode if mode.carries_literal() => (operand.field, Extension::Word(operand.literal as u16)),
        _ => (operand.field, Extension::None),
    }
}

pub fn pass_one(unit: Unit) -> Result<PassOne> {
    FirstPass::lay_out(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn lay_out(source: &str) -> PassOne {
        pass_one(tokenize("test.dasm", source).unwrap()).unwrap()
    }

    fn words(pass: &PassOne) -> Vec<Vec<u16>> {
        pass.code
            .records()
            .iter()
            .map(|r| r.words().to_vec())
            .collect()
    }

    #[test]
    fn pointer_offsets() {
        let pass = lay_out(":a SET A, 5\n:b SET A, 0x1000\n:c DAT \"hi\"\n:d");
        let offsets = ["a", "b", "c", "d"].map(|name| pass.labels.offset(name));
        assert_eq!(offsets, [Some(0), Some(2), Some(6), Some(10)]);
        assert_eq!(pass.code.len_bytes(), 10);
        assert_eq!(
            words(&pass),
            vec![vec![0x9801], vec![0x7C01, 0x1000], vec![0x0068, 0x0069]]
        );
    }

    #[test]
    fn backward_label_folds_only_in_a() {
        let pass = lay_out(":start SET A, 1\nSET B, start\nSET start, A");
        assert_eq!(
            words(&pass),
            vec![vec![0x8801], vec![0x8421], vec![0x03E1, 0x0000]]
        );
        assert!(pass
            .labels
            .operands()
            .all(|id| pass.labels.get(id).role == Role::Operand(OperandState::Resolved)));
    }

    #[test]
    fn forward_label_gets_placeholder() {
        let pass = lay_out("SET PC, end\n:end");
        assert_eq!(words(&pass), vec![vec![0x7F81, 0x0000]]);

        let id = pass.labels.operands().next().unwrap();
        assert_eq!(
            pass.labels.get(id).role,
            Role::Operand(OperandState::Pending(Slot { record: 0, word: 1 }))
        );
        assert_eq!(pass.labels.offset("end"), Some(4));
    }

    #[test]
    fn extension_words_follow_a_then_b() {
        let pass = lay_out("SET [0x1000], 0x20");
        // b = [next word] (0x1E), a = next word (0x1F)
        assert_eq!(words(&pass), vec![vec![0x7FC1, 0x0020, 0x1000]]);
    }

    #[test]
    fn debug_lines_and_labels() {
        let pass = lay_out("; header\n:main  SET A, 2\n  JSR main ; again\n");
        let lines = pass
            .debug
            .lines
            .iter()
            .map(|l| (l.offset, l.text.as_str(), l.line_number))
            .collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                (0, ":main  SET A, 2", 2),
                (1, "JSR main ; again", 3)
            ]
        );
        assert_eq!(pass.debug.labels.get("main"), Some(&0));
    }

    #[test]
    fn program_must_fit_in_memory() {
        assert_eq!(word_index(MEMORY_BYTES - 2), Ok(0xFFFF));
        assert_eq!(word_index(MEMORY_BYTES), Err(ErrorKind::ProgramTooLarge));
    }
}
