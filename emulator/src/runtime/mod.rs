use miette::Diagnostic;
use parse_display::Display;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants as C;
use crate::image::{self, LoadError};
use crate::snapshot::Snapshot;

mod arguments;
mod console;
mod exception;
mod instructions;
mod memory;
mod registers;
mod stack;

pub use self::arguments::Operand;
pub use self::console::{BufferConsole, Console, Interceptor, Resume, StdConsole};
pub use self::exception::Exception;
pub use self::instructions::Instruction;
pub use self::memory::{Memory, MemoryError};
pub use self::registers::{Reg, Registers};
pub use self::stack::{Stack, StackUnderflow};

use self::instructions::Flow;

/// A fault: the exception raised by an instruction, and where it happened
#[derive(Error, Diagnostic, Debug)]
#[error(
    "computer faulted at address {ip} (opcode {})",
    .opcode.map_or_else(|| "?".to_owned(), |o| o.to_string())
)]
#[diagnostic(
    code(processor::fault),
    help("the instruction pointer and the opcode identify the failing instruction")
)]
pub struct ProcessorError {
    /// Address of the failing instruction
    pub ip: C::Address,

    /// Opcode of the failing instruction, if it could be read
    pub opcode: Option<C::Word>,

    #[source]
    pub exception: Exception,
}

type Result<T> = std::result::Result<T, ProcessorError>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum Status {
    /// Executing instructions
    #[default]
    Running,

    /// Stopped by a `halt`, a `ret` on an empty stack, or an interceptor
    Halted,

    /// Stopped by an exception
    Faulted,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Computer {
    /// Instruction pointer
    pub ip: C::Address,
    pub memory: Memory,
    pub stack: Stack,
    pub status: Status,

    /// Number of instructions executed so far
    pub cycles: usize,
}

impl Computer {
    #[must_use]
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            ..Self::default()
        }
    }

    /// Build a computer from a binary program image
    ///
    /// # Errors
    ///
    /// Fails if the image is malformed or too big for the memory.
    pub fn load(image: &[u8]) -> std::result::Result<Self, LoadError> {
        let program = image::parse(image)?;
        let memory = Memory::with_program(&program).map_err(|_| LoadError::ImageTooLarge {
            words: program.len(),
        })?;
        info!(words = program.len(), "Program loaded");
        Ok(Self::new(memory))
    }

    /// Build a running computer from a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut computer = Self::default();
        computer.restore(snapshot);
        computer
    }

    /// Capture the state of the computer
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            ip: self.ip,
            stack: self.stack.as_slice().to_vec(),
            memory: self.memory.clone(),
        }
    }

    /// Replace the state of the computer with a snapshot. The computer is running afterwards, and
    /// its cycle count starts over.
    #[tracing::instrument(skip_all, fields(ip = snapshot.ip, stack = snapshot.stack.len()))]
    pub fn restore(&mut self, snapshot: Snapshot) {
        debug!("Restoring snapshot");
        self.ip = snapshot.ip;
        self.stack = Stack::from(snapshot.stack);
        self.memory = snapshot.memory;
        self.status = Status::Running;
        self.cycles = 0;
    }

    #[must_use]
    pub fn registers(&self) -> Registers {
        self.memory.registers()
    }

    /// Read-mode resolution of an operand
    pub(crate) fn value(&self, operand: Operand) -> std::result::Result<C::Word, Exception> {
        operand.value(&self.memory)
    }

    /// Decode the instruction at the instruction pointer
    ///
    /// # Errors
    ///
    /// Fails if the instruction can not be decoded.
    pub fn current_instruction(&self) -> std::result::Result<Instruction, Exception> {
        Instruction::decode(&self.memory, self.ip)
    }

    /// Execute one instruction
    ///
    /// # Errors
    ///
    /// Fails if the instruction raised an exception. The computer is faulted afterwards.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<Status> {
        self.step_inner(console, None)
    }

    /// Execute one instruction, handing over to the interceptor when `in` reads its sentinel
    ///
    /// # Errors
    ///
    /// Fails if the instruction raised an exception. The computer is faulted afterwards.
    pub fn step_intercepted(
        &mut self,
        console: &mut dyn Console,
        interceptor: &mut dyn Interceptor,
    ) -> Result<Status> {
        self.step_inner(console, Some(interceptor))
    }

    #[tracing::instrument(skip_all, fields(ip = self.ip), level = "trace")]
    fn step_inner(
        &mut self,
        console: &mut dyn Console,
        interceptor: Option<&mut (dyn Interceptor + '_)>,
    ) -> Result<Status> {
        if self.status != Status::Running {
            return Ok(self.status);
        }

        let ip = self.ip;
        let flow = match Instruction::decode(&self.memory, ip) {
            Ok(inst) => {
                debug!("Executing instruction \"{}\"", inst);
                inst.execute(self, console, interceptor)
                    .map(|flow| (flow, inst.width()))
            }
            Err(e) => Err(e),
        };

        match flow {
            Ok((Flow::Next, width)) => self.ip = ip + width,
            Ok((Flow::Jump(address), _)) => self.ip = address,
            Ok((Flow::Stay, _)) => {}
            Ok((Flow::Halt, _)) => {
                info!(ip, "Halted");
                self.status = Status::Halted;
            }
            Err(exception) => {
                self.status = Status::Faulted;
                let opcode = self.memory.get(ip).ok();
                warn!(ip, ?opcode, exception = %exception, "Faulted");
                return Err(ProcessorError {
                    ip,
                    opcode,
                    exception,
                });
            }
        }

        self.cycles += 1;
        Ok(self.status)
    }

    /// Run until the computer halts
    ///
    /// # Errors
    ///
    /// Fails on the first exception raised by an instruction.
    pub fn run(&mut self, console: &mut dyn Console) -> Result<()> {
        self.run_inner(console, None)
    }

    /// Run until the computer halts, handing over to the interceptor when `in` reads its sentinel
    ///
    /// # Errors
    ///
    /// Fails on the first exception raised by an instruction.
    pub fn run_intercepted(
        &mut self,
        console: &mut dyn Console,
        interceptor: &mut dyn Interceptor,
    ) -> Result<()> {
        self.run_inner(console, Some(interceptor))
    }

    #[tracing::instrument(skip_all)]
    fn run_inner(
        &mut self,
        console: &mut dyn Console,
        mut interceptor: Option<&mut (dyn Interceptor + '_)>,
    ) -> Result<()> {
        while self.step_inner(console, interceptor.as_deref_mut())? == Status::Running {}
        debug!(cycles = self.cycles, "End of program");
        Ok(())
    }
}
