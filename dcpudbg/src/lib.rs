use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
pub use serde_json::Error;

/// One assembled record and the source line it came from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SdbLine {
    /// Word offset of the record.
    pub offset: u16,
    /// Length of the record in words.
    pub words: u32,
    pub text: String,
    /// 1-based.
    pub line_number: usize,
}

/// Debug symbols for one assembled program. Offsets are in words.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Sdb {
    pub name: String,
    pub lines: Vec<SdbLine>,
    pub offset_map: HashMap<u16, usize>,
    pub labels: BTreeMap<String, u16>,
}

impl Sdb {
    pub fn new(name: &str) -> Self {
        Sdb {
            name: name.into(),
            lines: Vec::new(),
            offset_map: HashMap::new(),
            labels: BTreeMap::new(),
        }
    }

    pub fn add_label(&mut self, label: String, offset: u16) {
        self.labels.insert(label, offset);
    }

    pub fn add_line(&mut self, offset: u16, words: u32, text: String, line_number: usize) {
        let index = self.lines.len();
        self.lines.push(SdbLine {
            offset,
            words,
            text,
            line_number,
        });
        // A zero-length record shares its offset with the next one.
        if words > 0 {
            self.offset_map.insert(offset, index);
        }
    }

    /// The record starting at `offset`.
    pub fn line_at(&self, offset: u16) -> Option<&SdbLine> {
        self.offset_map.get(&offset).map(|&index| &self.lines[index])
    }

    /// The record covering `offset`, which may be one of its extension words.
    pub fn line_containing(&self, offset: u16) -> Option<&SdbLine> {
        let index = self
            .lines
            .partition_point(|line| line.offset <= offset)
            .checked_sub(1)?;
        let line = &self.lines[index];
        (u32::from(offset) < u32::from(line.offset) + line.words).then_some(line)
    }

    /// Labels pointing at `offset`, in name order.
    pub fn labels_at(&self, offset: u16) -> impl Iterator<Item = &str> + '_ {
        self.labels
            .iter()
            .filter(move |(_, at)| **at == offset)
            .map(|(name, _)| name.as_str())
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(dbg: &str) -> Result<Self, Error> {
        serde_json::from_str(dbg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sdb {
        let mut sdb = Sdb::new("loop.dasm");
        sdb.add_label("start".into(), 0);
        sdb.add_label("main".into(), 0);
        sdb.add_line(0, 1, "SET A, 5".into(), 2);
        sdb.add_line(1, 2, "SET PC, start".into(), 3);
        sdb.add_line(3, 0, "DAT \"\"".into(), 4);
        sdb
    }

    #[test]
    fn lookup() {
        let sdb = sample();
        assert_eq!(sdb.line_at(1).map(|l| l.line_number), Some(3));
        assert!(sdb.line_at(2).is_none());
        assert!(sdb.line_at(3).is_none());

        assert_eq!(sdb.line_containing(2).map(|l| l.line_number), Some(3));
        assert!(sdb.line_containing(3).is_none());
        assert_eq!(sdb.labels_at(0).collect::<Vec<_>>(), vec!["main", "start"]);
    }

    #[test]
    fn record_spanning_all_memory() {
        let mut sdb = Sdb::new("full.dasm");
        sdb.add_line(0, 0x1_0000, "DAT \"...\"".into(), 1);
        assert_eq!(sdb.line_containing(0xFFFF).map(|l| l.words), Some(0x1_0000));
    }

    #[test]
    fn json_round_trip() {
        let sdb = sample();
        let reloaded = Sdb::from_json(&sdb.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, sdb);
    }
}
