pub mod constants;
pub mod disassembler;
pub mod image;
pub mod runtime;
pub mod snapshot;

pub use self::disassembler::disassemble;
pub use self::runtime::{Computer, ProcessorError, Status};
pub use self::snapshot::{Snapshot, SnapshotError};
