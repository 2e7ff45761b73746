use std::io::{BufReader, Write};
use std::process::exit;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use synacor_emulator::runtime::{Console, Interceptor, StdConsole};
use synacor_emulator::{Computer, Snapshot};
use tracing::{debug, info};

use crate::interactive::Shell;

/// Exit code of a run which ended on a fault
const FAULT_EXIT_CODE: i32 = 2;

fn parse_sentinel(input: &str) -> Result<u8, String> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => u8::try_from(c).map_err(|e| e.to_string()),
        _ => Err("the sentinel must be a single ASCII character".to_owned()),
    }
}

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Program image, not needed when resuming a saved state
    #[clap(
        value_parser,
        value_hint = ValueHint::FilePath,
        required_unless_present = "resume"
    )]
    input: Option<Utf8PathBuf>,

    /// Resume from a saved state instead of starting from the image
    #[clap(short, long, value_parser, value_hint = ValueHint::FilePath)]
    resume: Option<Utf8PathBuf>,

    /// Character which opens the debug shell when read by the program
    #[clap(short, long, value_parser = parse_sentinel, default_value = "!")]
    sentinel: u8,

    /// Do not install the debug shell, the sentinel is passed to the program
    #[clap(long, action = ArgAction::SetTrue)]
    no_shell: bool,
}

impl RunOpt {
    fn computer(&self) -> anyhow::Result<Computer> {
        if let Some(path) = &self.resume {
            info!(%path, "Resuming saved state");
            let bytes = std::fs::read(path).with_context(|| format!("could not read {path}"))?;
            let snapshot = Snapshot::from_bytes(&bytes)?;
            return Ok(Computer::from_snapshot(snapshot));
        }

        let path = self
            .input
            .as_ref()
            .context("a program image or a saved state is needed")?;
        info!(%path, "Reading program");
        let bytes = std::fs::read(path).with_context(|| format!("could not read {path}"))?;
        Ok(Computer::load(&bytes)?)
    }

    pub fn exec(self) -> anyhow::Result<()> {
        let mut computer = self.computer()?;

        // Not locking stdin, the debug shell may need to read the terminal too
        let mut console = StdConsole::new(BufReader::new(std::io::stdin()), std::io::stdout());

        debug!(ip = computer.ip, sentinel = %char::from(self.sentinel), "Running program");
        let code = if self.no_shell {
            execute(&mut computer, &mut console, None)
        } else {
            let mut shell = Shell::new(self.sentinel);
            execute(&mut computer, &mut console, Some(&mut shell))
        };

        let (_, mut stdout) = console.into_inner();
        stdout.flush()?;

        if code != 0 {
            exit(code);
        }

        Ok(())
    }
}

/// Run the computer to completion, and get the exit code of the process
fn execute(
    computer: &mut Computer,
    console: &mut dyn Console,
    interceptor: Option<&mut dyn Interceptor>,
) -> i32 {
    let res = match interceptor {
        Some(interceptor) => computer.run_intercepted(console, interceptor),
        None => computer.run(console),
    };

    if let Err(e) = res {
        let report = miette::Report::new(e);
        eprintln!("{report:?}");
        info!(registers = %computer.registers(), "Registers at the time of the fault");
        return FAULT_EXIT_CODE;
    }

    info!(registers = %computer.registers(), cycles = computer.cycles, "End of program");
    0
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use synacor_emulator::runtime::{BufferConsole, Memory};

    use super::*;

    fn computer_with(program: &[u16]) -> Computer {
        Computer::new(Memory::with_program(program).unwrap())
    }

    #[test]
    fn exit_code_test() {
        let mut console = BufferConsole::new();
        let mut computer = computer_with(&[19, 65, 0]);
        assert_eq!(execute(&mut computer, &mut console, None), 0);
        assert_eq!(console.output_string(), "A");

        // pop on an empty stack
        let mut computer = computer_with(&[3, 32768]);
        assert_eq!(
            execute(&mut computer, &mut console, None),
            FAULT_EXIT_CODE
        );
    }

    #[test]
    fn input_is_optional_when_resuming_test() {
        let opt = RunOpt::try_parse_from(["run", "--resume", "state.bin"]).unwrap();
        assert_eq!(opt.input, None);
        assert_eq!(opt.resume.as_deref(), Some(camino::Utf8Path::new("state.bin")));

        assert!(RunOpt::try_parse_from(["run"]).is_err());
    }

    #[test]
    fn parse_sentinel_test() {
        assert_eq!(parse_sentinel("!"), Ok(b'!'));
        assert_eq!(parse_sentinel("~"), Ok(b'~'));
        assert!(parse_sentinel("").is_err());
        assert!(parse_sentinel("ab").is_err());
        assert!(parse_sentinel("é").is_err());
    }
}
