pub mod op;
pub mod operand;

pub use op::{BasicOp, Op, SpecialOp};
pub use operand::{AddressingMode, Register};
