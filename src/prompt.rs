//! Line-based console prompts.
//!
//! Every question is printed as `"<question> (default: <value>): "`; an
//! empty answer takes the default. The reader and writer are generic so
//! the driver can be exercised with in-memory buffers.

use std::io::{BufRead, Stdin, StdinLock, Stdout, Write};

use anyhow::Result;

pub struct Prompter<R, W> {
    reader: R,
    writer: W,
}

pub type ConsolePrompter = Prompter<StdinLock<'static>, Stdout>;

impl ConsolePrompter {
    pub fn console() -> Self {
        let stdin: Stdin = std::io::stdin();
        Prompter::new(stdin.lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Print `prompt` and read one line. `None` at end of input.
    pub fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.writer, "{}", prompt)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Ask with a default; blank input or end of input takes the default.
    pub fn ask(&mut self, question: &str, default: &str) -> Result<String> {
        let answer = self.read_line(&format!("{} (default: {}): ", question, default))?;
        Ok(match answer {
            Some(a) if !a.trim().is_empty() => a.trim().to_string(),
            _ => default.to_string(),
        })
    }

    /// Ask for an optional value shown as `(default: none)`.
    pub fn ask_optional(&mut self, question: &str) -> Result<Option<String>> {
        let answer = self.read_line(&format!("{} (default: none): ", question))?;
        Ok(answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()))
    }

    /// Yes/no question. Unrecognized answers take the default.
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let shown = if default { "yes" } else { "no" };
        let answer = self.ask(question, shown)?;
        Ok(match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            other => {
                tracing::debug!(answer = other, "unrecognized yes/no answer, using default");
                default
            }
        })
    }

    /// Print a line of output.
    pub fn say(&mut self, text: impl std::fmt::Display) -> Result<()> {
        writeln!(self.writer, "{}", text)?;
        Ok(())
    }
}
