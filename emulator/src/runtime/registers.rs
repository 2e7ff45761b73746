use parse_display::{Display, FromStr};

use crate::constants as C;

/// One of the eight memory-mapped registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, FromStr)]
#[display(style = "lowercase")]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Reg {
    pub const ALL: [Reg; C::REGISTER_COUNT] = [
        Reg::R0,
        Reg::R1,
        Reg::R2,
        Reg::R3,
        Reg::R4,
        Reg::R5,
        Reg::R6,
        Reg::R7,
    ];

    /// Index of the register, between 0 and 7
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Address at which this register is mapped in memory
    #[must_use]
    pub fn address(self) -> C::Address {
        // `index` is always below 8, this never truncates
        C::REGISTER_START + self as C::Address
    }

    /// Find the register mapped at the given address, if any
    #[must_use]
    pub fn from_address(address: C::Address) -> Option<Self> {
        let index = address.checked_sub(C::REGISTER_START)?;
        Self::ALL.get(usize::from(index)).copied()
    }
}

/// A copy of the content of all registers
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers(pub [C::Word; C::REGISTER_COUNT]);

impl Registers {
    #[must_use]
    pub fn get(&self, reg: Reg) -> C::Word {
        self.0[reg.index()]
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, reg) in Reg::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{reg} = {}", self.get(*reg))?;
        }
        Ok(())
    }
}
