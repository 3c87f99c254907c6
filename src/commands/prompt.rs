// src/commands/prompt.rs

//! Yes/no confirmation before destructive operations

use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Ask `question` on stdout and read the answer from stdin
pub fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    confirm_with(&mut stdin.lock(), &mut stdout, question)
}

/// Ask `question` on `output` and read one line from `input`
///
/// Only `y`/`yes` (any case) confirm; everything else, including EOF, declines.
pub fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<bool> {
    write!(output, "{} [y/N]: ", question)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
