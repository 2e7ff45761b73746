use std::borrow::Cow;
use std::collections::BTreeSet;
use std::marker::PhantomData;

use anstyle::Style;
use clap::{Command, CommandFactory};
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Context;
use rustyline_derive::Helper;

const REGISTERS: [&str; 8] = ["r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7"];

/// What the word under the cursor should be completed with
#[derive(Debug, PartialEq, Eq)]
enum Completion {
    /// A list of candidates, each replacing the last `usize` bytes of the line
    Words(usize, BTreeSet<String>),

    /// A path on the filesystem
    Path,
}

/// Rustyline helper for the debug shell: completes commands, registers and paths, and hints when
/// there is a single candidate.
#[derive(Helper)]
pub(crate) struct ShellHelper<T: CommandFactory> {
    filenames: FilenameCompleter,
    commands: PhantomData<T>,
}

impl<T: CommandFactory> ShellHelper<T> {
    pub fn new() -> Self {
        Self {
            filenames: FilenameCompleter::new(),
            commands: PhantomData,
        }
    }

    /// Split the line up to the cursor, with an empty last word if the cursor is after a space
    fn words(line: &str) -> Option<Vec<String>> {
        let mut words = shell_words::split(line).ok()?;
        if line.ends_with(|c: char| c == ' ' || c == '\t') || words.is_empty() {
            words.push(String::new());
        }
        Some(words)
    }
}

fn complete(command: &Command, words: &[String]) -> Completion {
    match words {
        [] => Completion::Words(0, BTreeSet::new()),

        [last] => {
            let candidates = command
                .get_subcommands()
                .flat_map(|cmd| {
                    std::iter::once(cmd.get_name().to_owned())
                        .chain(cmd.get_visible_aliases().map(ToOwned::to_owned))
                })
                .chain(std::iter::once("help".to_owned()))
                .filter(|name| name.starts_with(last.as_str()))
                .collect();
            Completion::Words(last.len(), candidates)
        }

        [head, args @ ..] => {
            let Some(sub) = command.find_subcommand(head) else {
                return Completion::Words(0, BTreeSet::new());
            };

            let last = args.last().map_or("", String::as_str);
            match sub.get_positionals().nth(args.len() - 1) {
                Some(arg) if arg.get_id() == "path" => Completion::Path,
                Some(arg) if arg.get_id() == "register" || arg.get_id() == "target" => {
                    let candidates = REGISTERS
                        .iter()
                        .filter(|reg| reg.starts_with(last))
                        .map(|reg| (*reg).to_owned())
                        .collect();
                    Completion::Words(last.len(), candidates)
                }
                _ => Completion::Words(last.len(), BTreeSet::new()),
            }
        }
    }
}

impl<T: CommandFactory> Completer for ShellHelper<T> {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Some(words) = Self::words(&line[..pos]) else {
            return Ok((pos, Vec::new()));
        };

        match complete(&T::command(), &words) {
            Completion::Path => self.filenames.complete(line, pos, ctx),
            Completion::Words(len, candidates) => {
                let candidates = candidates
                    .into_iter()
                    .map(|word| Pair {
                        display: word.clone(),
                        replacement: word,
                    })
                    .collect();
                Ok((pos - len, candidates))
            }
        }
    }
}

impl<T: CommandFactory> Hinter for ShellHelper<T> {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }

        let words = Self::words(line)?;
        match complete(&T::command(), &words) {
            Completion::Words(len, candidates) if candidates.len() == 1 => {
                let candidate = candidates.into_iter().next()?;
                candidate.get(len..).map(ToOwned::to_owned)
            }
            _ => None,
        }
    }
}

impl<T: CommandFactory> Highlighter for ShellHelper<T> {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        let style = Style::new().dimmed();
        Cow::Owned(format!("{style}{hint}{style:#}"))
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        let style = Style::new().bold();
        Cow::Owned(format!("{style}{prompt}{style:#}"))
    }
}

impl<T: CommandFactory> Validator for ShellHelper<T> {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        // Unbalanced quotes continue on the next line
        if shell_words::split(ctx.input()).is_err() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}
