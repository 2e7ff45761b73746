use miette::Diagnostic;
use thiserror::Error;

use super::memory::MemoryError;
use super::registers::Reg;
use super::stack::StackUnderflow;
use crate::constants::Word;

/// Anything that can go wrong while executing an instruction.
///
/// None of those are recoverable: they stop the computer.
#[derive(Error, Diagnostic, Debug)]
pub enum Exception {
    #[error("invalid memory access ({0})")]
    #[diagnostic(code(exception::invalid_memory_access))]
    InvalidMemoryAccess(#[from] MemoryError),

    #[error("pop on an empty stack")]
    #[diagnostic(code(exception::stack_underflow))]
    StackUnderflow,

    #[error("invalid operand {raw}")]
    #[diagnostic(
        code(exception::invalid_operand),
        help("operands are either literals below 32768 or registers between 32768 and 32775")
    )]
    InvalidOperand { raw: Word },

    #[error("register {reg} holds {value}, which is not a valid value")]
    #[diagnostic(
        code(exception::double_indirection),
        help("registers can not refer to other registers")
    )]
    DoubleIndirection { reg: Reg, value: Word },

    #[error("operand {raw} can not be written to")]
    #[diagnostic(
        code(exception::invalid_target),
        help("the destination of an instruction must be a register")
    )]
    InvalidTarget { raw: Word },

    #[error("division by zero")]
    #[diagnostic(code(exception::division_by_zero))]
    DivisionByZero,

    #[error("can not output character {value}")]
    #[diagnostic(code(exception::invalid_character))]
    InvalidCharacter { value: Word },

    #[error("no more input")]
    #[diagnostic(code(exception::end_of_input))]
    EndOfInput,

    #[error("console I/O error")]
    #[diagnostic(code(exception::io))]
    Io(#[from] std::io::Error),
}

impl From<StackUnderflow> for Exception {
    fn from(_: StackUnderflow) -> Self {
        Exception::StackUnderflow
    }
}
