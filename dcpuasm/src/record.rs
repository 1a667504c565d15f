use std::fmt::Display;

use crate::error::{reserve_one, ErrorKind};

/// A reserved word inside an already emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub record: usize,
    pub word: usize,
}

/// One opcode word followed by up to two extension words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    words: [u16; 3],
    len: usize,
}

impl Instruction {
    pub fn new(opcode: u16) -> Self {
        Self {
            words: [opcode, 0, 0],
            len: 1,
        }
    }

    /// Append an extension word, returning its index in the instruction.
    pub fn extend(&mut self, word: u16) -> Result<usize, ErrorKind> {
        if self.len == self.words.len() {
            return Err(ErrorKind::Internal(
                "instruction has more than two extension words".into(),
            ));
        }
        self.words[self.len] = word;
        self.len += 1;
        Ok(self.len - 1)
    }

    pub fn opcode(&self) -> u16 {
        self.words[0]
    }

    pub fn words(&self) -> &[u16] {
        &self.words[..self.len]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Instruction(Instruction),
    Data(Vec<u16>),
}

#[allow(clippy::len_without_is_empty)]
impl Record {
    pub fn words(&self) -> &[u16] {
        match self {
            Record::Instruction(instruction) => instruction.words(),
            Record::Data(words) => words,
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.words().len() * 2
    }
}

/// The assembled program: records in program order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryCode {
    records: Vec<Record>,
}

impl BinaryCode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, returning its index.
    pub fn push(&mut self, record: Record) -> Result<usize, ErrorKind> {
        reserve_one(&mut self.records, "appending a binary code record")?;
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    /// Overwrite a previously reserved extension word.
    pub fn patch(&mut self, slot: Slot, value: u16) -> Result<(), ErrorKind> {
        match self.records.get_mut(slot.record) {
            Some(Record::Instruction(instruction)) if slot.word > 0 && slot.word < instruction.len => {
                instruction.words[slot.word] = value;
                Ok(())
            }
            _ => Err(ErrorKind::Internal(format!(
                "no extension word at record {} word {}",
                slot.record, slot.word
            ))),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Size of the whole program in bytes.
    pub fn len_bytes(&self) -> usize {
        self.records.iter().map(Record::len).sum()
    }

    pub fn words(&self) -> impl Iterator<Item = u16> + '_ {
        self.records.iter().flat_map(|r| r.words().iter().copied())
    }

    /// Raw image, each word big-endian.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.words().flat_map(u16::to_be_bytes).collect()
    }
}

impl Display for BinaryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut offset = 0;
        for record in &self.records {
            write!(f, "{:0>4X}:", offset)?;
            for word in record.words() {
                write!(f, " {:0>4X}", word)?;
            }
            writeln!(f)?;
            offset += record.words().len();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_extension_word() {
        let mut code = BinaryCode::new();
        let mut instruction = Instruction::new(0x7F81);
        let word = instruction.extend(0).unwrap();
        let record = code.push(Record::Instruction(instruction)).unwrap();

        code.patch(Slot { record, word }, 0x20).unwrap();
        assert_eq!(code.records()[0].words(), &[0x7F81, 0x0020]);
        assert_eq!(code.len_bytes(), 4);
    }

    #[test]
    fn patch_rejects_opcode_and_data() {
        let mut code = BinaryCode::new();
        code.push(Record::Instruction(Instruction::new(0x9801)))
            .unwrap();
        code.push(Record::Data(vec![0x68, 0x69])).unwrap();

        assert!(code.patch(Slot { record: 0, word: 0 }, 1).is_err());
        assert!(code.patch(Slot { record: 0, word: 1 }, 1).is_err());
        assert!(code.patch(Slot { record: 1, word: 1 }, 1).is_err());
        assert!(code.patch(Slot { record: 7, word: 1 }, 1).is_err());
    }

    #[test]
    fn at_most_two_extension_words() {
        let mut instruction = Instruction::new(0x7FE1);
        assert_eq!(instruction.extend(1), Ok(1));
        assert_eq!(instruction.extend(2), Ok(2));
        assert!(instruction.extend(3).is_err());
        assert_eq!(instruction.opcode(), 0x7FE1);
        assert_eq!(instruction.words(), &[0x7FE1, 1, 2]);
    }

    #[test]
    fn listing_counts_words() {
        let mut code = BinaryCode::new();
        code.push(Record::Instruction(Instruction::new(0x9801)))
            .unwrap();
        code.push(Record::Data(vec![0x68, 0x69])).unwrap();
        code.push(Record::Instruction(Instruction::new(0x8B81)))
            .unwrap();

        assert_eq!(
            code.to_string(),
            "0000: 9801\n0001: 0068 0069\n0003: 8B81\n"
        );
        assert_eq!(
            code.to_be_bytes(),
            vec![0x98, 0x01, 0x00, 0x68, 0x00, 0x69, 0x8B, 0x81]
        );
    }
}
