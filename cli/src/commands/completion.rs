use std::io::Write;

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::{generate, Shell};

use crate::Opt;

/// Name under which the completions are registered
const BINARY_NAME: &str = "synacor";

#[derive(Parser, Debug)]
pub struct CompletionOpt {
    /// Shell to generate the completion script for
    #[clap(value_enum)]
    shell: ShellKind,
}

/// Shells supported by `clap_complete`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ShellKind {
    Bash,
    Elvish,
    Fish,
    #[clap(name = "powershell")]
    PowerShell,
    Zsh,
}

impl From<ShellKind> for Shell {
    fn from(kind: ShellKind) -> Self {
        match kind {
            ShellKind::Bash => Shell::Bash,
            ShellKind::Elvish => Shell::Elvish,
            ShellKind::Fish => Shell::Fish,
            ShellKind::PowerShell => Shell::PowerShell,
            ShellKind::Zsh => Shell::Zsh,
        }
    }
}

/// Write the completion script of the `synacor` binary for a shell
fn write_completions(shell: ShellKind, out: &mut dyn Write) {
    let mut command = Opt::command();
    generate(Shell::from(shell), &mut command, BINARY_NAME, out);
}

impl CompletionOpt {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();
        write_completions(self.shell, &mut stdout);
        stdout.flush()?;
        Ok(())
    }
}
