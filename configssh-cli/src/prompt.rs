//! Yes/no confirmation prompts.

use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Input closed before anything was typed.
    Canceled,
}

#[derive(Debug, Clone, Copy)]
pub struct Prompt {
    assume_yes: bool,
}

impl Prompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    /// Whether answers come from the terminal rather than `--yes`.
    pub fn interactive(&self) -> bool {
        !self.assume_yes
    }

    pub fn confirm(&self, text: &str) -> io::Result<Answer> {
        if self.assume_yes {
            return Ok(Answer::Yes);
        }
        let stdin = io::stdin();
        confirm_with(&mut stdin.lock(), &mut io::stdout(), text)
    }
}

pub fn confirm_with(
    input: &mut impl BufRead,
    out: &mut impl Write,
    text: &str,
) -> io::Result<Answer> {
    write!(out, "> {text} (yes/no) ")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Answer::Canceled);
    }
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(Answer::Yes),
        _ => Ok(Answer::No),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(input: &str) -> (Answer, String) {
        let mut out = Vec::new();
        let answer = confirm_with(&mut input.as_bytes(), &mut out, "Continue?").unwrap();
        (answer, String::from_utf8(out).unwrap())
    }

    #[test]
    fn yes_variants() {
        assert_eq!(answer("yes\n").0, Answer::Yes);
        assert_eq!(answer("Y\n").0, Answer::Yes);
        assert_eq!(answer("  yes  \n").0, Answer::Yes);
    }

    #[test]
    fn anything_else_is_no() {
        assert_eq!(answer("no\n").0, Answer::No);
        assert_eq!(answer("\n").0, Answer::No);
        assert_eq!(answer("maybe\n").0, Answer::No);
    }

    #[test]
    fn closed_input_cancels() {
        assert_eq!(answer("").0, Answer::Canceled);
    }

    #[test]
    fn prompt_text_is_written() {
        assert_eq!(answer("y\n").1, "> Continue? (yes/no) ");
    }

    #[test]
    fn assume_yes_skips_input() {
        let prompt = Prompt::new(true);
        assert!(!prompt.interactive());
        assert_eq!(prompt.confirm("Continue?").unwrap(), Answer::Yes);
    }
}
