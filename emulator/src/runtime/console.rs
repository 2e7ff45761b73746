//! Character I/O of the computer, and the hook used by debuggers to take over the input.

use std::collections::VecDeque;
use std::io::{BufRead, ErrorKind, Write};

use super::Computer;

/// Where the `in` instruction reads from and the `out` instruction writes to
pub trait Console {
    /// Read the next byte, blocking until one is available.
    ///
    /// Returns `None` at the end of the input.
    ///
    /// # Errors
    ///
    /// Forwards any underlying I/O error.
    fn read_byte(&mut self) -> std::io::Result<Option<u8>>;

    /// Write one byte to the output
    ///
    /// # Errors
    ///
    /// Forwards any underlying I/O error.
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()>;
}

/// What to do after an [`Interceptor`] took over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Go back reading the console input
    Input,

    /// Drop the current instruction, and continue from the instruction pointer of the computer.
    ///
    /// This is what should be returned after the computer state was replaced.
    Restart,

    /// Halt the computer
    Exit,
}

/// Gets control of the computer when the `in` instruction reads a specific byte
pub trait Interceptor {
    /// The byte that triggers the interception
    fn sentinel(&self) -> u8;

    /// Called with exclusive access to the computer, which is stopped on the `in` instruction
    fn intercept(&mut self, computer: &mut Computer, console: &mut dyn Console) -> Resume;
}

/// A [`Console`] over any reader and writer pair, like stdin and stdout
#[derive(Debug)]
pub struct StdConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StdConsole<R, W> {
    #[must_use]
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[must_use]
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: BufRead, W: Write> Console for StdConsole<R, W> {
    fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        // Whatever was written so far should be visible before blocking on the input
        self.output.flush()?;

        loop {
            let byte = match self.input.fill_buf() {
                Ok(buf) => buf.first().copied(),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if byte.is_some() {
                self.input.consume(1);
            }

            return Ok(byte);
        }
    }

    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.output.write_all(&[byte])?;
        if byte == b'\n' {
            self.output.flush()?;
        }
        Ok(())
    }
}

/// An in-memory [`Console`], with a queued input and a captured output
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferConsole {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl BufferConsole {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// The captured output, lossily decoded as UTF-8
    #[must_use]
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Console for BufferConsole {
    fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.output.push(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_console_test() {
        let input: &[u8] = b"ab";
        let mut console = StdConsole::new(input, Vec::new());

        assert_eq!(console.read_byte().unwrap(), Some(b'a'));
        assert_eq!(console.read_byte().unwrap(), Some(b'b'));
        assert_eq!(console.read_byte().unwrap(), None);

        console.write_byte(b'x').unwrap();
        console.write_byte(b'\n').unwrap();
        let (_, output) = console.into_inner();
        assert_eq!(output, b"x\n");
    }

    #[test]
    fn buffer_console_test() {
        let mut console = BufferConsole::with_input(b"hi");
        assert_eq!(console.read_byte().unwrap(), Some(b'h'));
        console.write_byte(b'o').unwrap();
        assert_eq!(console.read_byte().unwrap(), Some(b'i'));
        assert_eq!(console.read_byte().unwrap(), None);
        assert_eq!(console.output_string(), "o");
    }
}
