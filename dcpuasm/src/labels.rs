use indexmap::IndexMap;

use crate::{
    error::{reserve_one, ErrorKind},
    record::Slot,
    token::Span,
};

/// Handle to a label record in [`Labels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerState {
    Unresolved,
    /// Byte offset from the start of the program.
    Resolved(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandState {
    Unresolved,
    /// Encoded with a zeroed extension word that pass two fills in.
    Pending(Slot),
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Pointer(PointerState),
    Operand(OperandState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub span: Span,
    pub role: Role,
}

/// Symbol tables of one compilation unit: label pointers (definitions) keyed
/// by name in definition order, and label operands (references) in source order.
#[derive(Debug, Default)]
pub struct Labels {
    arena: Vec<Label>,
    pointers: IndexMap<String, LabelId>,
    operands: Vec<LabelId>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, label: Label) -> Result<LabelId, ErrorKind> {
        reserve_one(&mut self.arena, "registering a label")?;
        self.arena.push(label);
        Ok(LabelId(self.arena.len() - 1))
    }

    /// Register a label pointer. A second pointer with the same name is an error.
    pub fn define(&mut self, name: &str, span: Span) -> Result<LabelId, ErrorKind> {
        if let Some(&first) = self.pointers.get(name) {
            let first = &self.get(first).span;
            return Err(ErrorKind::DuplicateLabel {
                name: name.to_owned(),
                row: first.row + 1,
                col: first.col + 1,
            });
        }

        let id = self.alloc(Label {
            name: name.to_owned(),
            span,
            role: Role::Pointer(PointerState::Unresolved),
        })?;
        self.pointers.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Register a label operand.
    pub fn reference(&mut self, name: &str, span: Span) -> Result<LabelId, ErrorKind> {
        let id = self.alloc(Label {
            name: name.to_owned(),
            span,
            role: Role::Operand(OperandState::Unresolved),
        })?;
        reserve_one(&mut self.operands, "registering a label operand")?;
        self.operands.push(id);
        Ok(id)
    }

    pub fn get(&self, id: LabelId) -> &Label {
        &self.arena[id.0]
    }

    pub fn pointer(&self, name: &str) -> Option<&Label> {
        self.pointers.get(name).map(|&id| self.get(id))
    }

    /// Byte offset of a resolved label pointer.
    pub fn offset(&self, name: &str) -> Option<usize> {
        match self.pointer(name)?.role {
            Role::Pointer(PointerState::Resolved(offset)) => Some(offset),
            _ => None,
        }
    }

    pub fn resolve_pointer(&mut self, id: LabelId, offset: usize) -> Result<(), ErrorKind> {
        let label = &mut self.arena[id.0];
        match label.role {
            Role::Pointer(PointerState::Unresolved) => {
                label.role = Role::Pointer(PointerState::Resolved(offset));
                Ok(())
            }
            _ => Err(ErrorKind::Internal(format!(
                "label '{}' has been resolved or is not a label pointer",
                label.name
            ))),
        }
    }

    pub fn set_operand_state(&mut self, id: LabelId, state: OperandState) -> Result<(), ErrorKind> {
        let label = &mut self.arena[id.0];
        match label.role {
            Role::Operand(_) => {
                label.role = Role::Operand(state);
                Ok(())
            }
            Role::Pointer(_) => Err(ErrorKind::Internal(format!(
                "label '{}' is a label pointer, not an operand",
                label.name
            ))),
        }
    }

    /// Label pointers in definition order.
    pub fn pointers(&self) -> impl Iterator<Item = &Label> + '_ {
        self.pointers.values().map(|&id| self.get(id))
    }

    /// Label operands in source order.
    pub fn operands(&self) -> impl Iterator<Item = LabelId> + '_ {
        self.operands.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Position;

    fn span(row: usize, col: usize) -> Span {
        Span::new(
            Position {
                offset: 0,
                row,
                col,
            },
            1,
        )
    }

    #[test]
    fn duplicate_pointer() {
        let mut labels = Labels::new();
        labels.define("loop", span(0, 0)).unwrap();
        let err = labels.define("loop", span(4, 2)).unwrap_err();
        assert_eq!(
            err,
            ErrorKind::DuplicateLabel {
                name: "loop".into(),
                row: 1,
                col: 1
            }
        );
    }

    #[test]
    fn operands_do_not_clash_with_pointers() {
        let mut labels = Labels::new();
        labels.reference("loop", span(0, 0)).unwrap();
        labels.reference("loop", span(1, 0)).unwrap();
        labels.define("loop", span(2, 0)).unwrap();
        assert_eq!(labels.operands().count(), 2);
        assert_eq!(labels.pointers().count(), 1);
    }

    #[test]
    fn pointer_resolves_once() {
        let mut labels = Labels::new();
        let id = labels.define("start", span(0, 0)).unwrap();
        assert_eq!(labels.offset("start"), None);
        labels.resolve_pointer(id, 8).unwrap();
        assert_eq!(labels.offset("start"), Some(8));
        assert!(matches!(
            labels.resolve_pointer(id, 10),
            Err(ErrorKind::Internal(_))
        ));
    }

    #[test]
    fn operand_state_only_on_operands() {
        let mut labels = Labels::new();
        let pointer = labels.define("a1", span(0, 0)).unwrap();
        let operand = labels.reference("a1", span(1, 0)).unwrap();
        labels
            .set_operand_state(operand, OperandState::Resolved)
            .unwrap();
        assert_eq!(
            labels.get(operand).role,
            Role::Operand(OperandState::Resolved)
        );
        assert!(labels
            .set_operand_state(pointer, OperandState::Resolved)
            .is_err());
    }
}
