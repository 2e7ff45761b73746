//! Decoding of instruction operands

use parse_display::Display;

use super::{exception::Exception, memory::Memory, registers::Reg};
use crate::constants as C;

/// A raw operand, as found after an opcode.
///
/// Values below 32768 are literals, values from 32768 to 32775 name a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{0}")]
pub enum Operand {
    Literal(C::Word),
    Register(Reg),
}

impl Operand {
    /// Classify a raw word
    ///
    /// # Errors
    ///
    /// Raises an error if the word is above the last register.
    pub fn decode(raw: C::Word) -> Result<Self, Exception> {
        if raw < C::REGISTER_START {
            Ok(Self::Literal(raw))
        } else {
            Reg::from_address(raw)
                .map(Self::Register)
                .ok_or(Exception::InvalidOperand { raw })
        }
    }

    /// The raw word this operand was decoded from
    #[must_use]
    pub fn raw(self) -> C::Word {
        match self {
            Self::Literal(value) => value,
            Self::Register(reg) => reg.address(),
        }
    }

    /// Read-mode resolution: the literal itself, or the content of the register
    ///
    /// # Errors
    ///
    /// Raises an error if the register holds something that is not a literal.
    pub fn value(self, memory: &Memory) -> Result<C::Word, Exception> {
        match self {
            Self::Literal(value) => Ok(value),
            Self::Register(reg) => {
                let value = memory.register(reg);
                if value >= C::REGISTER_START {
                    Err(Exception::DoubleIndirection { reg, value })
                } else {
                    Ok(value)
                }
            }
        }
    }

    /// Write-mode resolution: the register named by this operand
    ///
    /// # Errors
    ///
    /// Raises an error if the operand is a literal.
    pub fn target(self) -> Result<Reg, Exception> {
        match self {
            Self::Register(reg) => Ok(reg),
            Self::Literal(raw) => Err(Exception::InvalidTarget { raw }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_test() {
        assert_eq!(Operand::decode(0).unwrap(), Operand::Literal(0));
        assert_eq!(Operand::decode(32767).unwrap(), Operand::Literal(32767));
        assert_eq!(Operand::decode(32768).unwrap(), Operand::Register(Reg::R0));
        assert_eq!(Operand::decode(32775).unwrap(), Operand::Register(Reg::R7));
        assert!(matches!(
            Operand::decode(32776),
            Err(Exception::InvalidOperand { raw: 32776 })
        ));
    }

    #[test]
    fn read_mode_test() {
        let mut memory = Memory::default();
        memory.set_register(Reg::R2, 1234);

        assert_eq!(Operand::Literal(42).value(&memory).unwrap(), 42);
        assert_eq!(Operand::Register(Reg::R2).value(&memory).unwrap(), 1234);

        // Registers never hold other registers
        memory.set_register(Reg::R3, 32770);
        assert!(matches!(
            Operand::Register(Reg::R3).value(&memory),
            Err(Exception::DoubleIndirection {
                reg: Reg::R3,
                value: 32770
            })
        ));
    }

    #[test]
    fn write_mode_test() {
        assert_eq!(Operand::Register(Reg::R4).target().unwrap(), Reg::R4);
        assert!(matches!(
            Operand::Literal(12).target(),
            Err(Exception::InvalidTarget { raw: 12 })
        ));
    }

    #[test]
    fn display_test() {
        assert_eq!(Operand::Literal(12).to_string(), "12");
        assert_eq!(Operand::Register(Reg::R1).to_string(), "r1");
        assert_eq!(Operand::Register(Reg::R1).raw(), 32769);
    }
}
