use parse_display::Display;
use tracing::debug;

use super::{
    arguments::Operand,
    console::{Console, Interceptor, Resume},
    exception::Exception,
    memory::{Memory, MemoryError},
    registers::Reg,
    Computer,
};
use crate::constants::{Address, Word, MODULO, VALUE_MASK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Instruction {
    /// Stop the execution
    #[display("halt")]
    Halt,

    /// Set a register to a value
    #[display("set  {0}, {1}")]
    Set(Reg, Operand),

    /// Push a value on the stack
    #[display("push {0}")]
    Push(Operand),

    /// Pop the top of the stack in a register
    #[display("pop  {0}")]
    Pop(Reg),

    /// Set a register to 1 if both values are equal, 0 otherwise
    #[display("eq   {0}, {1}, {2}")]
    Eq(Reg, Operand, Operand),

    /// Set a register to 1 if the first value is strictly greater, 0 otherwise
    #[display("gt   {0}, {1}, {2}")]
    Gt(Reg, Operand, Operand),

    /// Unconditional jump
    #[display("jmp  {0}")]
    Jmp(Operand),

    /// Jump if the first value is non-zero
    #[display("jt   {0}, {1}")]
    Jt(Operand, Operand),

    /// Jump if the first value is zero
    #[display("jf   {0}, {1}")]
    Jf(Operand, Operand),

    /// Add two values, modulo 32768
    #[display("add  {0}, {1}, {2}")]
    Add(Reg, Operand, Operand),

    /// Multiply two values, modulo 32768
    #[display("mult {0}, {1}, {2}")]
    Mult(Reg, Operand, Operand),

    /// Remainder of the division of two values
    #[display("mod  {0}, {1}, {2}")]
    Mod(Reg, Operand, Operand),

    /// Bitwise `and`
    #[display("and  {0}, {1}, {2}")]
    And(Reg, Operand, Operand),

    /// Bitwise `or`
    #[display("or   {0}, {1}, {2}")]
    Or(Reg, Operand, Operand),

    /// 15-bit bitwise negation
    #[display("not  {0}, {1}")]
    Not(Reg, Operand),

    /// Read a memory cell in a register
    #[display("rmem {0}, {1}")]
    Rmem(Reg, Operand),

    /// Write a value to a memory cell
    #[display("wmem {0}, {1}")]
    Wmem(Operand, Operand),

    /// Push the address of the next instruction and jump
    #[display("call {0}")]
    Call(Operand),

    /// Pop an address and jump to it. Halts if the stack is empty
    #[display("ret")]
    Ret,

    /// Write a character to the console
    #[display("out  {0}")]
    Out(Operand),

    /// Read a character from the console
    #[display("in   {0}")]
    In(Reg),

    /// No-op
    #[display("noop")]
    Noop,
}

/// What happens to the instruction pointer after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Move to the next instruction
    Next,

    /// Go to the given address
    Jump(Address),

    /// Leave the instruction pointer where it is
    Stay,

    /// Stop the computer
    Halt,
}

impl Instruction {
    /// Decode the instruction found at the given address
    ///
    /// # Errors
    ///
    /// Raises an error if the instruction or one of its operands is out of the memory, or if an
    /// operand is invalid.
    pub fn decode(memory: &Memory, address: Address) -> Result<Self, Exception> {
        use Instruction::*;

        let opcode = memory.get(address)?;

        let raw = |n: Address| -> Result<Word, Exception> {
            let address = address
                .checked_add(n)
                .ok_or(MemoryError::InvalidAddress(address))?;
            Ok(memory.get(address)?)
        };
        let arg = |n: Address| -> Result<Operand, Exception> { Operand::decode(raw(n)?) };
        let reg = |n: Address| -> Result<Reg, Exception> { arg(n)?.target() };

        let instruction = match opcode {
            0 => Halt,
            1 => Set(reg(1)?, arg(2)?),
            2 => Push(arg(1)?),
            3 => Pop(reg(1)?),
            4 => Eq(reg(1)?, arg(2)?, arg(3)?),
            5 => Gt(reg(1)?, arg(2)?, arg(3)?),
            6 => Jmp(arg(1)?),
            7 => Jt(arg(1)?, arg(2)?),
            8 => Jf(arg(1)?, arg(2)?),
            9 => Add(reg(1)?, arg(2)?, arg(3)?),
            10 => Mult(reg(1)?, arg(2)?, arg(3)?),
            11 => Mod(reg(1)?, arg(2)?, arg(3)?),
            12 => And(reg(1)?, arg(2)?, arg(3)?),
            13 => Or(reg(1)?, arg(2)?, arg(3)?),
            14 => Not(reg(1)?, arg(2)?),
            15 => Rmem(reg(1)?, arg(2)?),
            16 => Wmem(arg(1)?, arg(2)?),
            17 => Call(arg(1)?),
            18 => Ret,
            19 => Out(arg(1)?),
            20 => In(reg(1)?),
            _ => Noop,
        };

        Ok(instruction)
    }

    /// Encode the instruction back to its opcode and raw operands
    #[must_use]
    pub fn encode(&self) -> Vec<Word> {
        use Instruction::*;

        let ops = |opcode: Word, args: &[Word]| -> Vec<Word> {
            std::iter::once(opcode).chain(args.iter().copied()).collect()
        };

        match *self {
            Halt => ops(0, &[]),
            Set(a, b) => ops(1, &[a.address(), b.raw()]),
            Push(a) => ops(2, &[a.raw()]),
            Pop(a) => ops(3, &[a.address()]),
            Eq(a, b, c) => ops(4, &[a.address(), b.raw(), c.raw()]),
            Gt(a, b, c) => ops(5, &[a.address(), b.raw(), c.raw()]),
            Jmp(a) => ops(6, &[a.raw()]),
            Jt(a, b) => ops(7, &[a.raw(), b.raw()]),
            Jf(a, b) => ops(8, &[a.raw(), b.raw()]),
            Add(a, b, c) => ops(9, &[a.address(), b.raw(), c.raw()]),
            Mult(a, b, c) => ops(10, &[a.address(), b.raw(), c.raw()]),
            Mod(a, b, c) => ops(11, &[a.address(), b.raw(), c.raw()]),
            And(a, b, c) => ops(12, &[a.address(), b.raw(), c.raw()]),
            Or(a, b, c) => ops(13, &[a.address(), b.raw(), c.raw()]),
            Not(a, b) => ops(14, &[a.address(), b.raw()]),
            Rmem(a, b) => ops(15, &[a.address(), b.raw()]),
            Wmem(a, b) => ops(16, &[a.raw(), b.raw()]),
            Call(a) => ops(17, &[a.raw()]),
            Ret => ops(18, &[]),
            Out(a) => ops(19, &[a.raw()]),
            In(a) => ops(20, &[a.address()]),
            Noop => ops(21, &[]),
        }
    }

    /// Number of words taken by the instruction, opcode included
    #[must_use]
    pub const fn width(&self) -> Address {
        use Instruction::*;

        match self {
            Halt | Ret | Noop => 1,
            Push(_) | Pop(_) | Jmp(_) | Call(_) | Out(_) | In(_) => 2,
            Set(..) | Jt(..) | Jf(..) | Not(..) | Rmem(..) | Wmem(..) => 3,
            Eq(..) | Gt(..) | Add(..) | Mult(..) | Mod(..) | And(..) | Or(..) => 4,
        }
    }

    /// Execute the instruction
    #[allow(clippy::too_many_lines)]
    #[tracing::instrument(skip(computer, console, interceptor))]
    pub(crate) fn execute(
        &self,
        computer: &mut Computer,
        console: &mut dyn Console,
        mut interceptor: Option<&mut (dyn Interceptor + '_)>,
    ) -> Result<Flow, Exception> {
        use Instruction::*;

        match *self {
            Halt => return Ok(Flow::Halt),

            Set(reg, arg) => {
                let val = computer.value(arg)?;
                computer.memory.set_register(reg, val);
            }

            Push(arg) => {
                let val = computer.value(arg)?;
                debug!("push({})", val);
                computer.stack.push(val);
            }

            Pop(reg) => {
                let val = computer.stack.pop()?;
                debug!("pop => {}", val);
                computer.memory.set_register(reg, val);
            }

            Eq(reg, a, b) => {
                let a = computer.value(a)?;
                let b = computer.value(b)?;
                computer.memory.set_register(reg, Word::from(a == b));
            }

            Gt(reg, a, b) => {
                let a = computer.value(a)?;
                let b = computer.value(b)?;
                computer.memory.set_register(reg, Word::from(a > b));
            }

            Jmp(arg) => {
                let address = computer.value(arg)?;
                return Ok(Flow::Jump(address));
            }

            Jt(cond, arg) => {
                if computer.value(cond)? != 0 {
                    return Ok(Flow::Jump(computer.value(arg)?));
                }
            }

            Jf(cond, arg) => {
                if computer.value(cond)? == 0 {
                    return Ok(Flow::Jump(computer.value(arg)?));
                }
            }

            Add(reg, a, b) => {
                let a = computer.value(a)?;
                let b = computer.value(b)?;
                // Both values are below 32768, the sum fits in a word
                let res = (a + b) % MODULO;
                debug!("{} + {} = {}", a, b, res);
                computer.memory.set_register(reg, res);
            }

            Mult(reg, a, b) => {
                let a = computer.value(a)?;
                let b = computer.value(b)?;
                // 65536 is a multiple of 32768, so the wrapped product has the same remainder
                let res = a.wrapping_mul(b) % MODULO;
                debug!("{} * {} = {}", a, b, res);
                computer.memory.set_register(reg, res);
            }

            Mod(reg, a, b) => {
                let a = computer.value(a)?;
                let b = computer.value(b)?;
                let res = a.checked_rem(b).ok_or(Exception::DivisionByZero)?;
                debug!("{} % {} = {}", a, b, res);
                computer.memory.set_register(reg, res);
            }

            And(reg, a, b) => {
                let a = computer.value(a)?;
                let b = computer.value(b)?;
                computer.memory.set_register(reg, a & b);
            }

            Or(reg, a, b) => {
                let a = computer.value(a)?;
                let b = computer.value(b)?;
                computer.memory.set_register(reg, a | b);
            }

            Not(reg, arg) => {
                let val = computer.value(arg)?;
                computer.memory.set_register(reg, val ^ VALUE_MASK);
            }

            Rmem(reg, arg) => {
                let address = computer.value(arg)?;
                let val = computer.memory.get(address)?;
                computer.memory.set_register(reg, val);
            }

            Wmem(arg, val) => {
                let address = computer.value(arg)?;
                let val = computer.value(val)?;
                computer.memory.set(address, val)?;
            }

            Call(arg) => {
                let address = computer.value(arg)?;
                computer.stack.push(computer.ip + self.width());
                debug!("Calling {}", address);
                return Ok(Flow::Jump(address));
            }

            Ret => {
                // Returning from the outermost frame is how programs end
                let Ok(address) = computer.stack.pop() else {
                    debug!("Returning with an empty stack");
                    return Ok(Flow::Halt);
                };
                debug!("Returning to {}", address);
                return Ok(Flow::Jump(address));
            }

            Out(arg) => {
                let value = computer.value(arg)?;
                let byte = u8::try_from(value).map_err(|_| Exception::InvalidCharacter { value })?;
                console.write_byte(byte)?;
            }

            In(reg) => loop {
                let byte = console.read_byte()?.ok_or(Exception::EndOfInput)?;

                if let Some(interceptor) = interceptor.as_deref_mut() {
                    if byte == interceptor.sentinel() {
                        debug!("Handing over to the interceptor");
                        match interceptor.intercept(computer, console) {
                            Resume::Input => continue,
                            Resume::Restart => return Ok(Flow::Stay),
                            Resume::Exit => return Ok(Flow::Halt),
                        }
                    }
                }

                computer.memory.set_register(reg, Word::from(byte));
                break;
            },

            Noop => {}
        }

        Ok(Flow::Next)
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::runtime::BufferConsole;

    fn computer_with(program: &[Word]) -> Computer {
        Computer::new(Memory::with_program(program).unwrap())
    }

    fn execute(computer: &mut Computer, instruction: Instruction) -> Result<Flow, Exception> {
        instruction.execute(computer, &mut BufferConsole::new(), None)
    }

    #[test]
    fn decode_test() {
        let computer = computer_with(&[9, 32768, 32769, 4, 19, 32768, 0, 42]);
        let add = Instruction::decode(&computer.memory, 0).unwrap();
        assert_eq!(
            add,
            Instruction::Add(
                Reg::R0,
                Operand::Register(Reg::R1),
                Operand::Literal(4)
            )
        );
        assert_eq!(add.width(), 4);
        assert_eq!(
            Instruction::decode(&computer.memory, 4).unwrap(),
            Instruction::Out(Operand::Register(Reg::R0))
        );
        assert_eq!(Instruction::decode(&computer.memory, 6).unwrap(), Instruction::Halt);
        // Anything past the last opcode is a no-op
        assert_eq!(Instruction::decode(&computer.memory, 7).unwrap(), Instruction::Noop);
    }

    #[test]
    fn decode_errors_test() {
        // Literal as a destination
        let computer = computer_with(&[1, 12, 3]);
        assert!(matches!(
            Instruction::decode(&computer.memory, 0),
            Err(Exception::InvalidTarget { raw: 12 })
        ));

        // Operand past the last register
        let computer = computer_with(&[2, 40000]);
        assert!(matches!(
            Instruction::decode(&computer.memory, 0),
            Err(Exception::InvalidOperand { raw: 40000 })
        ));

        // Opcode outside of the memory
        let computer = computer_with(&[0]);
        assert!(matches!(
            Instruction::decode(&computer.memory, 32776),
            Err(Exception::InvalidMemoryAccess(MemoryError::InvalidAddress(
                32776
            )))
        ));
    }

    #[test]
    fn encode_test() {
        let program = [
            Instruction::Set(Reg::R1, Operand::Literal(5)),
            Instruction::Call(Operand::Literal(100)),
            Instruction::In(Reg::R7),
        ];
        let words: Vec<Word> = program.iter().flat_map(Instruction::encode).collect();
        assert_eq!(words, vec![1, 32769, 5, 17, 100, 20, 32775]);

        for instruction in program {
            assert_eq!(
                instruction.encode().len(),
                usize::from(instruction.width())
            );
        }
    }

    #[test]
    fn display_test() {
        let instruction = Instruction::Eq(
            Reg::R0,
            Operand::Register(Reg::R1),
            Operand::Literal(32767),
        );
        assert_snapshot!(instruction.to_string(), @"eq   r0, r1, 32767");
        assert_snapshot!(Instruction::Mult(Reg::R2, Operand::Literal(3), Operand::Literal(4)).to_string(), @"mult r2, 3, 4");
        assert_snapshot!(Instruction::Ret.to_string(), @"ret");
    }

    #[test]
    fn arithmetic_test() {
        let mut computer = Computer::default();

        execute(
            &mut computer,
            Instruction::Add(Reg::R0, Operand::Literal(32758), Operand::Literal(15)),
        )
        .unwrap();
        assert_eq!(computer.memory.register(Reg::R0), 5);

        execute(
            &mut computer,
            Instruction::Mult(Reg::R1, Operand::Literal(32767), Operand::Literal(32767)),
        )
        .unwrap();
        assert_eq!(computer.memory.register(Reg::R1), 1);

        execute(
            &mut computer,
            Instruction::Mod(Reg::R2, Operand::Literal(17), Operand::Literal(5)),
        )
        .unwrap();
        assert_eq!(computer.memory.register(Reg::R2), 2);

        assert!(matches!(
            execute(
                &mut computer,
                Instruction::Mod(Reg::R2, Operand::Literal(17), Operand::Literal(0)),
            ),
            Err(Exception::DivisionByZero)
        ));
    }

    #[test]
    fn results_stay_in_range_test() {
        let mut computer = Computer::default();
        let values = [0, 1, 2, 255, 16384, 32766, 32767];

        for a in values {
            for b in values {
                let (a, b) = (Operand::Literal(a), Operand::Literal(b));
                let mut instructions = vec![
                    Instruction::Add(Reg::R0, a, b),
                    Instruction::Mult(Reg::R0, a, b),
                    Instruction::And(Reg::R0, a, b),
                    Instruction::Or(Reg::R0, a, b),
                    Instruction::Not(Reg::R0, a),
                ];
                if b != Operand::Literal(0) {
                    instructions.push(Instruction::Mod(Reg::R0, a, b));
                }

                for instruction in instructions {
                    execute(&mut computer, instruction).unwrap();
                    assert!(
                        computer.memory.register(Reg::R0) < MODULO,
                        "{instruction} went out of range"
                    );
                }
            }
        }
    }

    #[test]
    fn bitwise_test() {
        let mut computer = Computer::default();

        execute(
            &mut computer,
            Instruction::And(Reg::R0, Operand::Literal(0b1100), Operand::Literal(0b1010)),
        )
        .unwrap();
        assert_eq!(computer.memory.register(Reg::R0), 0b1000);

        execute(
            &mut computer,
            Instruction::Or(Reg::R0, Operand::Literal(0b1100), Operand::Literal(0b1010)),
        )
        .unwrap();
        assert_eq!(computer.memory.register(Reg::R0), 0b1110);

        execute(&mut computer, Instruction::Not(Reg::R0, Operand::Literal(0))).unwrap();
        assert_eq!(computer.memory.register(Reg::R0), 0x7FFF);
    }

    #[test]
    fn comparison_test() {
        let mut computer = Computer::default();
        computer.memory.set_register(Reg::R1, 10);

        execute(
            &mut computer,
            Instruction::Eq(Reg::R0, Operand::Register(Reg::R1), Operand::Literal(10)),
        )
        .unwrap();
        assert_eq!(computer.memory.register(Reg::R0), 1);

        execute(
            &mut computer,
            Instruction::Gt(Reg::R0, Operand::Register(Reg::R1), Operand::Literal(10)),
        )
        .unwrap();
        assert_eq!(computer.memory.register(Reg::R0), 0);

        execute(
            &mut computer,
            Instruction::Gt(Reg::R0, Operand::Literal(11), Operand::Register(Reg::R1)),
        )
        .unwrap();
        assert_eq!(computer.memory.register(Reg::R0), 1);
    }

    #[test]
    fn memory_access_test() {
        let mut computer = Computer::default();

        execute(
            &mut computer,
            Instruction::Wmem(Operand::Literal(1000), Operand::Literal(77)),
        )
        .unwrap();
        assert_eq!(computer.memory.get(1000), Ok(77));

        execute(&mut computer, Instruction::Rmem(Reg::R3, Operand::Literal(1000))).unwrap();
        assert_eq!(computer.memory.register(Reg::R3), 77);
    }

    #[test]
    fn conditional_jumps_are_complementary_test() {
        let conditions = [Operand::Literal(0), Operand::Literal(1), Operand::Literal(32767)];

        for cond in conditions {
            let target = Operand::Literal(1234);
            let mut computer = Computer::default();
            let jt = execute(&mut computer, Instruction::Jt(cond, target)).unwrap();
            let jf = execute(&mut computer, Instruction::Jf(cond, target)).unwrap();

            // Exactly one of them jumps, the other one moves to the next instruction, which is
            // at the same place for both
            match (jt, jf) {
                (Flow::Jump(1234), Flow::Next) | (Flow::Next, Flow::Jump(1234)) => {}
                other => panic!("unexpected flows {other:?}"),
            }
        }
    }

    #[test]
    fn out_test() {
        let mut computer = Computer::default();
        let mut console = BufferConsole::new();

        Instruction::Out(Operand::Literal(u16::from(b'A')))
            .execute(&mut computer, &mut console, None)
            .unwrap();
        assert_eq!(console.output, b"A");

        assert!(matches!(
            Instruction::Out(Operand::Literal(300)).execute(&mut computer, &mut console, None),
            Err(Exception::InvalidCharacter { value: 300 })
        ));
    }

    #[test]
    fn in_test() {
        let mut computer = Computer::default();
        let mut console = BufferConsole::with_input(b"x");

        Instruction::In(Reg::R5)
            .execute(&mut computer, &mut console, None)
            .unwrap();
        assert_eq!(computer.memory.register(Reg::R5), u16::from(b'x'));

        assert!(matches!(
            Instruction::In(Reg::R5).execute(&mut computer, &mut console, None),
            Err(Exception::EndOfInput)
        ));
    }

    struct Recorder {
        calls: usize,
        resume: Resume,
    }

    impl Interceptor for Recorder {
        fn sentinel(&self) -> u8 {
            b'!'
        }

        fn intercept(&mut self, computer: &mut Computer, _console: &mut dyn Console) -> Resume {
            self.calls += 1;
            computer.memory.set_register(Reg::R0, 99);
            self.resume
        }
    }

    #[test]
    fn interceptor_test() {
        let mut computer = Computer::default();
        let mut console = BufferConsole::with_input(b"!a");
        let mut recorder = Recorder {
            calls: 0,
            resume: Resume::Input,
        };

        let flow = Instruction::In(Reg::R1)
            .execute(&mut computer, &mut console, Some(&mut recorder))
            .unwrap();
        assert_eq!(flow, Flow::Next);
        assert_eq!(recorder.calls, 1);
        assert_eq!(computer.memory.register(Reg::R0), 99);
        assert_eq!(computer.memory.register(Reg::R1), u16::from(b'a'));

        let mut console = BufferConsole::with_input(b"!a");
        recorder.resume = Resume::Restart;
        let flow = Instruction::In(Reg::R2)
            .execute(&mut computer, &mut console, Some(&mut recorder))
            .unwrap();
        assert_eq!(flow, Flow::Stay);
        assert_eq!(computer.memory.register(Reg::R2), 0);
        // The rest of the input was not consumed
        assert_eq!(console.input, b"a");

        let mut console = BufferConsole::with_input(b"!");
        recorder.resume = Resume::Exit;
        let flow = Instruction::In(Reg::R2)
            .execute(&mut computer, &mut console, Some(&mut recorder))
            .unwrap();
        assert_eq!(flow, Flow::Halt);
    }

    #[test]
    fn sentinel_is_plain_input_without_interceptor_test() {
        let mut computer = Computer::default();
        let mut console = BufferConsole::with_input(b"!");
        Instruction::In(Reg::R1)
            .execute(&mut computer, &mut console, None)
            .unwrap();
        assert_eq!(computer.memory.register(Reg::R1), u16::from(b'!'));
    }
}
