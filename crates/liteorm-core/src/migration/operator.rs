//! Operator interaction.
//!
//! The migration engine never touches the terminal directly; every message and
//! question goes through an [`Operator`]. [`TerminalOperator`] is the line-based
//! implementation over any reader and writer, so tests can script answers.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// One option of a [`Operator::choose`] question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Answer that selects this option.
    pub key: String,
    /// Explanation shown next to the key.
    pub label: String,
    /// Other accepted answers.
    pub aliases: Vec<String>,
}

impl Choice {
    /// Create a choice.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            aliases: Vec::new(),
        }
    }

    /// Accept another answer for this choice.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Check if `answer` selects this choice, ignoring case.
    pub fn matches(&self, answer: &str) -> bool {
        self.key.eq_ignore_ascii_case(answer)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(answer))
    }
}

/// Whoever answers migration questions.
pub trait Operator {
    /// Show a line of output.
    fn say(&mut self, line: &str) -> io::Result<()>;

    /// Ask a free-form question. Returns the trimmed answer, or `None` once
    /// input is exhausted.
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Ask a yes/no question. An empty answer takes `default`.
    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "(Y/n):" } else { "(y/N):" };
        let answer = self.ask(&format!("{} {}", prompt, hint))?.unwrap_or_default();
        Ok(match answer.to_ascii_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    /// Pick one of `choices`. Returns `None` for an empty or unknown answer.
    fn choose(&mut self, prompt: &str, choices: &[Choice]) -> io::Result<Option<usize>> {
        for choice in choices {
            self.say(&format!("{} - {}", choice.key, choice.label))?;
        }
        let keys: Vec<&str> = choices.iter().map(|c| c.key.as_str()).collect();
        let answer = self.ask(&format!("{} ({}):", prompt, keys.join("/")))?;
        Ok(answer.and_then(|answer| choices.iter().position(|c| c.matches(&answer))))
    }
}

impl<O: Operator + ?Sized> Operator for &mut O {
    fn say(&mut self, line: &str) -> io::Result<()> {
        (**self).say(line)
    }

    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        (**self).ask(prompt)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool> {
        (**self).confirm(prompt, default)
    }

    fn choose(&mut self, prompt: &str, choices: &[Choice]) -> io::Result<Option<usize>> {
        (**self).choose(prompt, choices)
    }
}

/// Line-based operator over a reader and a writer.
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl TerminalOperator<StdinLock<'static>, Stdout> {
    /// Operator on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    /// Create an operator over `input` and `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Borrow the output.
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Consume the operator and return its output.
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{}", line)
    }

    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{} ", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn operator(input: &str) -> TerminalOperator<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(op: TerminalOperator<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(op.into_output()).unwrap()
    }

    #[test]
    fn test_confirm_answers() {
        let mut op = operator("y\nYES\nno\n\n\n");
        assert!(op.confirm("Execute?", false).unwrap());
        assert!(op.confirm("Execute?", false).unwrap());
        assert!(!op.confirm("Execute?", true).unwrap());
        assert!(!op.confirm("Execute?", false).unwrap());
        assert!(op.confirm("Confirm?", true).unwrap());

        let text = output(op);
        assert!(text.contains("Execute? (y/N):"));
        assert!(text.contains("Confirm? (Y/n):"));
    }

    #[test]
    fn test_eof_takes_default() {
        let mut op = operator("");
        assert!(!op.confirm("Execute?", false).unwrap());
        assert!(op.confirm("Confirm?", true).unwrap());
        assert_eq!(op.ask("Value:").unwrap(), None);
    }

    #[test]
    fn test_choose() {
        let choices = [
            Choice::new("y", "Execute all operations").alias("yes"),
            Choice::new("s", "Execute operations one by one").alias("step"),
            Choice::new("n", "Skip all operations"),
        ];
        let mut op = operator("STEP\nq\n\n");

        assert_eq!(op.choose("Choose an option", &choices).unwrap(), Some(1));
        assert_eq!(op.choose("Choose an option", &choices).unwrap(), None);
        assert_eq!(op.choose("Choose an option", &choices).unwrap(), None);

        let text = output(op);
        assert!(text.contains("s - Execute operations one by one"));
        assert!(text.contains("Choose an option (y/s/n):"));
    }

    #[test]
    fn test_ask_trims() {
        let mut op = operator("  42 \n");
        assert_eq!(op.ask("Value:").unwrap().as_deref(), Some("42"));
    }
}
