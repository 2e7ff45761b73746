//! Binary program images: little-endian 16-bit words, loaded at address 0

use miette::Diagnostic;
use thiserror::Error;

use crate::constants::{Word, ADDRESS_SPACE};

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("image has an odd length of {len} bytes")]
    #[diagnostic(
        code(image::odd_length),
        help("images are made of 16-bit words, their size must be a multiple of 2")
    )]
    OddLength { len: usize },

    #[error("image has {words} words, which does not fit in memory")]
    #[diagnostic(
        code(image::too_large),
        help("the address space holds at most 32768 words")
    )]
    ImageTooLarge { words: usize },
}

/// Decode a binary image into words
///
/// # Errors
///
/// Fails if the image has a trailing byte, or has more words than the address space.
pub fn parse(bytes: &[u8]) -> Result<Vec<Word>, LoadError> {
    if bytes.len() % 2 != 0 {
        return Err(LoadError::OddLength { len: bytes.len() });
    }

    let words = bytes.len() / 2;
    if words > ADDRESS_SPACE {
        return Err(LoadError::ImageTooLarge { words });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| Word::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode words as a binary image
#[must_use]
pub fn encode(words: &[Word]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}
