use miette::Diagnostic;
use thiserror::Error;

use crate::constants::Word;

#[derive(Debug, Error, Diagnostic, Clone, Copy, PartialEq, Eq)]
#[error("stack underflow")]
#[diagnostic(code(stack::underflow))]
pub struct StackUnderflow;

/// The auxiliary stack, used by `push`, `pop`, `call` and `ret`.
///
/// It is not bounded, and lives outside of the addressable memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stack {
    inner: Vec<Word>,
}

impl Stack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Word) {
        self.inner.push(value);
    }

    /// Remove the last pushed value
    ///
    /// # Errors
    ///
    /// It fails if the stack is empty.
    pub fn pop(&mut self) -> Result<Word, StackUnderflow> {
        self.inner.pop().ok_or(StackUnderflow)
    }

    /// Last pushed value
    #[must_use]
    pub fn peek(&self) -> Option<Word> {
        self.inner.last().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Content of the stack, in push order (bottom first)
    #[must_use]
    pub fn as_slice(&self) -> &[Word] {
        &self.inner
    }
}

impl From<Vec<Word>> for Stack {
    fn from(inner: Vec<Word>) -> Self {
        Self { inner }
    }
}
