use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use synacor_emulator::runtime::Memory;
use synacor_emulator::{disassemble, image};
use tracing::info;

use crate::interactive::Number;

#[derive(Parser, Debug)]
pub struct DisassembleOpt {
    /// Program image
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Address of the first instruction to print
    #[clap(short, long, value_parser, default_value = "0")]
    start: Number,

    /// Number of lines to print, defaults to the whole image
    #[clap(short = 'n', long, value_parser)]
    count: Option<usize>,
}

impl DisassembleOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = %self.input, "Reading program");
        let bytes = std::fs::read(&self.input)?;
        let program = image::parse(&bytes)?;
        let end = program.len();
        let memory = Memory::with_program(&program)?;

        let count = self.count.unwrap_or(usize::MAX);
        let lines = disassemble(&memory, self.start.0)
            // Without an explicit count, stop at the end of the image
            .take_while(|line| self.count.is_some() || usize::from(line.address()) < end)
            .take(count);

        for line in lines {
            println!("{line}");
        }

        Ok(())
    }
}
