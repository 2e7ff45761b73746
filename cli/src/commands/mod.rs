use clap::Parser;

mod completion;
mod disassemble;
mod run;

#[derive(Parser, Debug)]
pub enum Subcommand {
    /// Load a program image and run it
    Run(self::run::RunOpt),

    /// Print the instructions of a program image
    Disassemble(self::disassemble::DisassembleOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Self::Run(opt) => opt.exec(),
            Self::Disassemble(opt) => opt.exec(),
            Self::Completion(opt) => opt.exec(),
        }
    }
}
