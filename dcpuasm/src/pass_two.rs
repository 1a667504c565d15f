use dcpudbg::Sdb;
use log::{debug, trace};

use crate::{
    error::{ErrorKind, Located, Result},
    labels::{OperandState, PointerState, Role},
    pass_one::{word_index, PassOne},
    record::BinaryCode,
};

struct PassTwo {
    pass_one: PassOne,
    patched: usize,
}

impl PassTwo {
    fn new(pass_one: PassOne) -> Self {
        Self {
            pass_one,
            patched: 0,
        }
    }

    /// Fill the placeholder word of every forward label operand.
    fn resolve_operands(&mut self) -> Result<(), Located> {
        let labels = &mut self.pass_one.labels;
        let operands = labels.operands().collect::<Vec<_>>();

        for id in operands {
            let label = labels.get(id);
            let (name, span) = (label.name.clone(), label.span);
            let at = |kind| Located::new(span, kind);

            let slot = match label.role {
                Role::Operand(OperandState::Resolved) => continue,
                Role::Operand(OperandState::Pending(slot)) => slot,
                Role::Operand(OperandState::Unresolved) => {
                    return Err(at(ErrorKind::Internal(format!(
                        "label operand '{}' was never encoded",
                        name
                    ))))
                }
                Role::Pointer(_) => {
                    return Err(at(ErrorKind::Internal(format!(
                        "label pointer '{}' listed as an operand",
                        name
                    ))))
                }
            };

            let offset = match labels.pointer(&name).map(|pointer| pointer.role) {
                Some(Role::Pointer(PointerState::Resolved(offset))) => offset,
                Some(_) => {
                    return Err(at(ErrorKind::Internal(format!(
                        "label pointer '{}' was never laid out",
                        name
                    ))))
                }
                None => return Err(at(ErrorKind::UndefinedLabel(name))),
            };

            let word = word_index(offset).map_err(at)?;
            self.pass_one.code.patch(slot, word).map_err(at)?;
            labels
                .set_operand_state(id, OperandState::Resolved)
                .map_err(at)?;
            trace!(
                "patched record {} word {} with {} = {:0>4X}",
                slot.record,
                slot.word,
                name,
                word
            );
            self.patched += 1;
        }
        Ok(())
    }
}

pub fn pass_two(pass_one: PassOne) -> Result<(BinaryCode, Sdb)> {
    let file = pass_one.file.clone();
    let mut pass = PassTwo::new(pass_one);
    pass.resolve_operands().map_err(|e| e.in_file(&file))?;

    debug!("{}: pass two patched {} label operands", file, pass.patched);
    Ok((pass.pass_one.code, pass.pass_one.debug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::tokenize, pass_one::pass_one};

    fn assemble(source: &str) -> Result<(BinaryCode, Sdb)> {
        pass_two(pass_one(tokenize("test.dasm", source)?)?)
    }

    #[test]
    fn forward_reference_is_patched() {
        let (code, _) = assemble("SET PC, end\nSET A, 1\n:end SET B, 2").unwrap();
        assert_eq!(code.records()[0].words(), &[0x7F81, 0x0003]);
    }

    #[test]
    fn forward_reference_never_folds() {
        let (code, _) = assemble("SET A, next\n:next").unwrap();
        assert_eq!(code.records()[0].words(), &[0x7C01, 0x0002]);
    }

    #[test]
    fn undefined_label() {
        let err = assemble("SET A, 1\n  SET B, nowhere").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedLabel("nowhere".into()));
        assert_eq!((err.row, err.col), (2, 10));
        assert_eq!(
            err.to_string(),
            "test.dasm:2:10 Label 'nowhere' does not match any label pointer"
        );
    }

    #[test]
    fn labels_are_case_sensitive() {
        let err = assemble(":Loop SET PC, loop").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedLabel("loop".into()));
    }
}
