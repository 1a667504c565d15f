use dcpudbg::Sdb;
use lexer::tokenize;
use pass_one::pass_one;
use pass_two::pass_two;

pub mod constants;
pub mod cursor;
pub mod error;
pub mod labels;
pub mod lexer;
pub mod operand;
pub mod pass_one;
pub mod pass_two;
pub mod record;
pub mod token;

pub use error::{AsmError, ErrorClass, ErrorKind, Result};
pub use record::{BinaryCode, Instruction, Record, Slot};

/// Assemble a DCPU-16 program from text.
///
/// `name` is only used to attribute errors.
///
/// # Errors
///
/// The first lexical, syntactic or semantic error in the program.
pub fn assemble_program(name: &str, program_text: &str) -> Result<BinaryCode> {
    Ok(assemble_with_debug(name, program_text)?.0)
}

/// Assemble a program and render it as a listing: one line per record, each
/// prefixed with its word offset.
pub fn assemble_listing(name: &str, program_text: &str) -> Result<String> {
    Ok(assemble_program(name, program_text)?.to_string())
}

pub fn assemble_with_debug(name: &str, program_text: &str) -> Result<(BinaryCode, Sdb)> {
    let unit = tokenize(name, program_text)?;
    let pass_one = pass_one(unit)?;

    pass_two(pass_one)
}
