use miette::Diagnostic;
use thiserror::Error;

use super::registers::{Reg, Registers};
use crate::constants::{
    Address, Word, ADDRESS_SPACE, MEMORY_SIZE, PROGRAM_START, REGISTER_COUNT,
};

/// Represents errors related to memory manipulations
#[derive(Debug, Error, Diagnostic, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The given address was invalid
    #[error("invalid address {0}")]
    #[diagnostic(code(memory::invalid_address))]
    InvalidAddress(Address),

    /// The program does not fit in the address space
    #[error("image of {len} words does not fit in memory")]
    #[diagnostic(
        code(memory::image_too_large),
        help("the address space holds at most 32768 words")
    )]
    ImageTooLarge { len: usize },

    /// A full memory image did not have the expected size
    #[error("memory image has {len} words, expected {}", MEMORY_SIZE)]
    #[diagnostic(code(memory::invalid_image))]
    InvalidImage { len: usize },
}

/// Holds the memory cells of the computer.
///
/// It has 32768 cells, followed by the 8 registers.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    inner: Box<[Word; MEMORY_SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            inner: Box::new([0; MEMORY_SIZE]),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory {{ registers: {:?}, cells: [...] }}", self.registers())
    }
}

impl Memory {
    /// Create a memory holding the given program at address 0
    ///
    /// # Errors
    ///
    /// It fails if the program is bigger than the address space.
    pub fn with_program(program: &[Word]) -> Result<Self, MemoryError> {
        let mut memory = Self::default();
        memory.load(program)?;
        Ok(memory)
    }

    /// Rebuild a memory from a full image, registers included
    ///
    /// # Errors
    ///
    /// It fails if the image does not have exactly one word per cell.
    pub fn from_words(words: &[Word]) -> Result<Self, MemoryError> {
        let inner: [Word; MEMORY_SIZE] = words
            .try_into()
            .map_err(|_| MemoryError::InvalidImage { len: words.len() })?;
        Ok(Self {
            inner: Box::new(inner),
        })
    }

    /// Replace the whole memory with the given program, loaded at address 0.
    ///
    /// Cells past the end of the program and registers are cleared.
    ///
    /// # Errors
    ///
    /// It fails if the program is bigger than the address space, in which case the memory is left
    /// untouched.
    pub fn load(&mut self, program: &[Word]) -> Result<(), MemoryError> {
        let start = usize::from(PROGRAM_START);
        if start + program.len() > ADDRESS_SPACE {
            return Err(MemoryError::ImageTooLarge { len: program.len() });
        }

        let mut inner = Box::new([0; MEMORY_SIZE]);
        inner[start..start + program.len()].copy_from_slice(program);
        self.inner = inner;
        Ok(())
    }

    /// Get the word at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get(&self, address: Address) -> Result<Word, MemoryError> {
        self.inner
            .get(usize::from(address))
            .copied()
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Set the word at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn set(&mut self, address: Address, value: Word) -> Result<(), MemoryError> {
        let cell = self
            .inner
            .get_mut(usize::from(address))
            .ok_or(MemoryError::InvalidAddress(address))?;
        *cell = value;
        Ok(())
    }

    #[must_use]
    pub fn register(&self, reg: Reg) -> Word {
        self.inner[ADDRESS_SPACE + reg.index()]
    }

    pub fn set_register(&mut self, reg: Reg, value: Word) {
        self.inner[ADDRESS_SPACE + reg.index()] = value;
    }

    /// Copy the content of all the registers
    #[must_use]
    pub fn registers(&self) -> Registers {
        let mut registers = [0; REGISTER_COUNT];
        registers.copy_from_slice(&self.inner[ADDRESS_SPACE..]);
        Registers(registers)
    }

    /// The full memory image, registers included
    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.inner[..]
    }
}
