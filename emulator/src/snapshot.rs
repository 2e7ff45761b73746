//! Saving and restoring the full state of a computer.
//!
//! The binary layout is made of little-endian 16-bit words:
//!
//! ```text
//! [ip][stack length][stack values, bottom first...][memory, registers included...]
//! ```
//!
//! The memory part always has one word per memory cell, so the total size only depends on the
//! stack length.

use miette::Diagnostic;
use thiserror::Error;

use crate::constants::{Address, Word, MEMORY_SIZE};
use crate::runtime::{Memory, MemoryError};

const WORD: usize = std::mem::size_of::<Word>();

/// Size of the `[ip][stack length]` header, in bytes
const HEADER_SIZE: usize = 2 * WORD;

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot is truncated ({len} bytes)")]
    #[diagnostic(code(snapshot::truncated))]
    Truncated { len: usize },

    #[error("corrupted snapshot: expected {expected} bytes, got {actual}")]
    #[diagnostic(
        code(snapshot::corrupt),
        help("the size of a snapshot is fixed by its stack length")
    )]
    Corrupt { expected: usize, actual: usize },

    #[error("stack of {len} values is too deep to be saved")]
    #[diagnostic(code(snapshot::stack_too_deep))]
    StackTooDeep { len: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),
}

/// A complete copy of a computer state, enough to resume its execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Instruction pointer
    pub ip: Address,

    /// Stack content, bottom first
    pub stack: Vec<Word>,

    pub memory: Memory,
}

impl Snapshot {
    /// Size in bytes of a serialized snapshot with the given stack length
    #[must_use]
    pub const fn serialized_size(stack_len: usize) -> usize {
        HEADER_SIZE + (stack_len + MEMORY_SIZE) * WORD
    }

    /// Serialize the snapshot
    ///
    /// # Errors
    ///
    /// Fails if the stack length does not fit in a word.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let len = self.stack.len();
        let stack_len = Word::try_from(len).map_err(|_| SnapshotError::StackTooDeep { len })?;

        let mut bytes = Vec::with_capacity(Self::serialized_size(len));
        bytes.extend_from_slice(&self.ip.to_le_bytes());
        bytes.extend_from_slice(&stack_len.to_le_bytes());

        let words = self.stack.iter().chain(self.memory.words());
        for word in words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }

        Ok(bytes)
    }

    /// Deserialize a snapshot
    ///
    /// # Errors
    ///
    /// Fails if the size of the input does not match the layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        if bytes.len() < HEADER_SIZE {
            return Err(SnapshotError::Truncated { len: bytes.len() });
        }

        let mut words = bytes
            .chunks_exact(WORD)
            .map(|pair| Word::from_le_bytes([pair[0], pair[1]]));

        // The header is there, those never fail
        let ip = words.next().unwrap_or_default();
        let stack_len = usize::from(words.next().unwrap_or_default());

        let expected = Self::serialized_size(stack_len);
        if bytes.len() != expected {
            return Err(SnapshotError::Corrupt {
                expected,
                actual: bytes.len(),
            });
        }

        let stack: Vec<Word> = words.by_ref().take(stack_len).collect();
        let memory: Vec<Word> = words.collect();
        let memory = Memory::from_words(&memory)?;

        Ok(Self { ip, stack, memory })
    }
}
