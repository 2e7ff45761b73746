//! Turn memory back into readable instructions

use std::fmt;

use crate::constants::{Address, Word};
use crate::runtime::{Instruction, Memory, Operand};

/// One decoded line of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Instruction(Address, Instruction),

    /// A word that does not decode to a valid instruction
    Data(Address, Word),
}

impl Line {
    #[must_use]
    pub const fn address(&self) -> Address {
        match self {
            Self::Instruction(address, _) | Self::Data(address, _) => *address,
        }
    }

    /// Number of words covered by this line
    #[must_use]
    pub const fn width(&self) -> Address {
        match self {
            Self::Instruction(_, instruction) => instruction.width(),
            Self::Data(..) => 1,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruction(address, instruction) => {
                write!(f, "{address:05}: {instruction}")?;
                // Show the characters printed by literal `out`s, it makes text easy to spot
                if let Instruction::Out(Operand::Literal(value)) = instruction {
                    if let Some(c) = u8::try_from(*value)
                        .ok()
                        .map(char::from)
                        .filter(|c| c.is_ascii_graphic() || *c == ' ')
                    {
                        write!(f, "  ; {c:?}")?;
                    }
                }
                Ok(())
            }
            Self::Data(address, word) => write!(f, "{address:05}: .word {word}"),
        }
    }
}

/// Iterator over the lines of a listing, starting at an address
#[derive(Debug)]
pub struct Listing<'a> {
    memory: &'a Memory,
    address: Option<Address>,
}

impl Iterator for Listing<'_> {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        let address = self.address?;
        let line = match Instruction::decode(self.memory, address) {
            Ok(instruction) => Line::Instruction(address, instruction),
            Err(_) => Line::Data(address, self.memory.get(address).ok()?),
        };
        self.address = address.checked_add(line.width());
        Some(line)
    }
}

/// List the instructions in memory, starting at an address
#[must_use]
pub fn disassemble(memory: &Memory, start: Address) -> Listing<'_> {
    Listing {
        memory,
        address: Some(start),
    }
}
