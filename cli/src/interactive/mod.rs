//! This module implements the debug shell, which takes over the program input when the sentinel
//! character is typed.
//!
//! It is mainly based on two crates:
//!   - rustyline, to handle the line-editting logic
//!   - clap, to handle the parsing of those interactive commands
//!
//! Using Parser to do this is a bit of a hack, and requires some weird options
//! to have it working but works nonetheless.
//!
//! Anything typed on the same line after the sentinel is run as a single command, without
//! entering the interactive prompt. This also makes the shell scriptable through piped input.

use std::io::IsTerminal;

use camino::Utf8PathBuf;
use clap::Parser;
use rustyline::history::DefaultHistory;
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use synacor_emulator::constants as C;
use synacor_emulator::runtime::{Console, Interceptor, Reg, Resume};
use synacor_emulator::{disassemble, Computer, Snapshot};
use tracing::{debug, info, warn};

mod helper;
mod parse;
use self::helper::ShellHelper;
pub(crate) use self::parse::Number;

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command."#;

#[derive(Parser, Clone, Debug, PartialEq, Eq)]
#[clap(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
)]
/// Debug shell commands
enum Command {
    /// Save the state of the computer to a file
    Save {
        #[clap(value_parser)]
        path: Utf8PathBuf,
    },

    /// Replace the state of the computer with a saved one
    Load {
        #[clap(value_parser)]
        path: Utf8PathBuf,
    },

    /// Show the state of registers
    Registers {
        #[clap(value_parser)]
        register: Option<Reg>,
    },

    /// Set a register or a memory cell
    Set {
        /// A register (r0 to r7) or a memory address
        #[clap(value_parser)]
        target: parse::AssignmentTarget,

        /// The value to set
        #[clap(value_parser)]
        value: parse::Number,
    },

    /// Show the content of a block in memory
    Memory {
        /// The address to show
        #[clap(value_parser)]
        address: parse::Number,

        /// Number of memory cells to show
        #[clap(value_parser, default_value = "1")]
        number: u16,
    },

    /// Show the content of the stack, top first
    Stack,

    /// Show the next few instructions
    List {
        /// Number of instructions to show
        #[clap(value_parser, default_value = "10")]
        number: usize,
    },

    /// Show the instruction pointer, the executed instructions count and the stack depth
    Info,

    /// Go back to the program
    #[command(alias = "c")]
    Continue,

    /// Stop the program
    Exit,
}

/// What the shell should do after a command
enum Outcome {
    /// Read the next command
    Prompt,

    /// Leave the shell
    Leave(Resume),
}

/// The debug shell, installed as the interceptor of the computer
pub(crate) struct Shell {
    sentinel: u8,
    editor: Option<Editor<ShellHelper<Command>, DefaultHistory>>,
    last_command: Option<Command>,

    /// Set once a snapshot was loaded, so that the computer restarts from its instruction pointer
    restored: bool,
}

impl Shell {
    pub fn new(sentinel: u8) -> Self {
        Self {
            sentinel,
            editor: None,
            last_command: None,
            restored: false,
        }
    }

    /// Read the rest of the current input line
    fn read_rest_of_line(console: &mut dyn Console) -> Option<String> {
        let mut line = Vec::new();
        loop {
            match console.read_byte() {
                Ok(Some(b'\n')) => break,
                Ok(Some(byte)) => line.push(byte),
                Ok(None) if line.is_empty() => return None,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = &e as &dyn std::error::Error, "Could not read input");
                    return None;
                }
            }
        }
        Some(String::from_utf8_lossy(&line).trim().to_owned())
    }

    /// Read a command line, from the terminal if there is one, from the program input otherwise
    fn read_line(&mut self, console: &mut dyn Console) -> Option<String> {
        if !std::io::stdin().is_terminal() {
            return Self::read_rest_of_line(console);
        }

        if self.editor.is_none() {
            let config = Config::builder()
                .history_ignore_space(true)
                .completion_type(CompletionType::List)
                .edit_mode(EditMode::Emacs)
                .behavior(Behavior::PreferTerm)
                .auto_add_history(true)
                .build();
            match Editor::with_config(config) {
                Ok(mut editor) => {
                    editor.set_helper(Some(ShellHelper::new()));
                    self.editor = Some(editor);
                }
                Err(e) => {
                    warn!(error = &e as &dyn std::error::Error, "Could not open the terminal");
                    return Self::read_rest_of_line(console);
                }
            }
        }

        let editor = self.editor.as_mut()?;
        editor.readline("(debug) >> ").ok()
    }

    /// Parse and run one command line
    fn run_line(&mut self, computer: &mut Computer, line: &str) -> Outcome {
        let command = if line.is_empty() {
            if let Some(command) = &self.last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                return Outcome::Prompt;
            }
        } else {
            let Ok(words) = shell_words::split(line) else {
                warn!("Invalid input");
                return Outcome::Prompt;
            };

            match Command::try_parse_from(words) {
                Ok(command) => {
                    self.last_command = Some(command.clone());
                    command
                }
                Err(e) => {
                    // This also covers `help`, which clap reports as an error
                    eprintln!("{e}");
                    return Outcome::Prompt;
                }
            }
        };

        debug!("Executing command: {:?}", command);
        match self.execute(computer, command) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{e:#}");
                Outcome::Prompt
            }
        }
    }

    fn execute(&mut self, computer: &mut Computer, command: Command) -> anyhow::Result<Outcome> {
        match command {
            Command::Save { path } => {
                let bytes = computer.snapshot().to_bytes()?;
                std::fs::write(&path, bytes)?;
                info!(%path, ip = computer.ip, "State saved");
            }

            Command::Load { path } => {
                let bytes = std::fs::read(&path)?;
                let snapshot = Snapshot::from_bytes(&bytes)?;
                computer.restore(snapshot);
                self.restored = true;
                info!(%path, ip = computer.ip, "State loaded");
            }

            Command::Registers { register } => {
                if let Some(reg) = register {
                    info!("Register {} = {}", reg, computer.memory.register(reg));
                } else {
                    info!("Registers: {}", computer.registers());
                }
            }

            Command::Set {
                target,
                value: parse::Number(value),
            } => match target {
                parse::AssignmentTarget::Register(reg) => {
                    anyhow::ensure!(value < C::MODULO, "registers only hold values below 32768");
                    info!("Setting register {reg} to {value}");
                    computer.memory.set_register(reg, value);
                }
                parse::AssignmentTarget::Address(address) => {
                    info!("Setting memory at address {address} to {value}");
                    computer.memory.set(address, value)?;
                }
            },

            Command::Memory {
                address: parse::Number(address),
                number,
            } => {
                for offset in 0..number {
                    let address = address.saturating_add(offset);
                    let value = computer.memory.get(address)?;
                    info!(address, value, "Memory");
                }
            }

            Command::Stack => {
                let stack = computer.stack.as_slice();
                info!(depth = stack.len(), "Stack");
                for value in stack.iter().rev() {
                    info!("  {value}");
                }
            }

            Command::List { number } => {
                for line in disassemble(&computer.memory, computer.ip).take(number) {
                    let gutter = if line.address() == computer.ip { ">" } else { " " };
                    info!("{gutter} {line}");
                }
            }

            Command::Info => {
                info!(
                    ip = computer.ip,
                    cycles = computer.cycles,
                    stack = computer.stack.len(),
                    status = %computer.status,
                    "Computer"
                );
            }

            Command::Continue => {
                let resume = if self.restored {
                    Resume::Restart
                } else {
                    Resume::Input
                };
                return Ok(Outcome::Leave(resume));
            }

            Command::Exit => return Ok(Outcome::Leave(Resume::Exit)),
        }

        Ok(Outcome::Prompt)
    }
}

impl Interceptor for Shell {
    fn sentinel(&self) -> u8 {
        self.sentinel
    }

    fn intercept(&mut self, computer: &mut Computer, console: &mut dyn Console) -> Resume {
        self.restored = false;

        // A command on the same line as the sentinel runs on its own
        let Some(inline) = Self::read_rest_of_line(console) else {
            return Resume::Exit;
        };
        if !inline.is_empty() {
            return match self.run_line(computer, &inline) {
                Outcome::Leave(resume) => resume,
                Outcome::Prompt if self.restored => Resume::Restart,
                Outcome::Prompt => Resume::Input,
            };
        }

        info!(
            ip = computer.ip,
            "Entering the debug shell. Type \"help\" to list available commands."
        );
        loop {
            let Some(line) = self.read_line(console) else {
                info!("EOF, exiting");
                return Resume::Exit;
            };

            if let Outcome::Leave(resume) = self.run_line(computer, line.trim()) {
                return resume;
            }
        }
    }
}
