pub type Address = u16;
pub type Word = u16;

/// Number of addressable memory cells
pub const ADDRESS_SPACE: usize = 32768;

/// Number of general purpose registers, mapped right after the address space
pub const REGISTER_COUNT: usize = 8;

/// Total size of the computer memory, registers included
pub const MEMORY_SIZE: usize = ADDRESS_SPACE + REGISTER_COUNT;

/// Address of the first register (`r0`)
pub const REGISTER_START: Address = 32768;

/// Arithmetic is done modulo this value
pub const MODULO: Word = 32768;

/// Mask of the 15 significant bits of a value
pub const VALUE_MASK: Word = 0x7FFF;

/// Address where the program image is loaded
pub const PROGRAM_START: Address = 0;
