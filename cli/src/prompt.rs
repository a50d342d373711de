//! Line-based interactive prompts (numbered selection and yes/no).
use std::io::{self, BufRead, Write};

/// Source of operator answers.
///
/// Implemented over any reader/writer pair so tests can script answers.
pub trait Prompt {
    /// Show a numbered list and return the zero-based index of the choice.
    /// An empty answer picks `default`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the answer is not a valid number
    /// in range (`InvalidInput`).
    fn select(&mut self, question: &str, options: &[&str], default: usize) -> io::Result<usize>;

    /// Ask a yes/no question; anything but `y`/`yes` means no.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// [`Prompt`] that writes questions to `output` and reads lines from `input`.
#[derive(Debug)]
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Create a prompt over the given reader and writer.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the prompt and return the writer (for inspecting output).
    pub fn into_output(self) -> W {
        self.output
    }

    fn read_answer(&mut self) -> io::Result<String> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no answer on input",
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl LinePrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process's stdin/stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn select(&mut self, question: &str, options: &[&str], default: usize) -> io::Result<usize> {
        writeln!(self.output, "\n{question}")?;
        for (i, name) in options.iter().enumerate() {
            let marker = if i == default { " (default)" } else { "" };
            writeln!(self.output, "  \x1b[1m{}\x1b[0m) {name}{marker}", i + 1)?;
        }
        write!(self.output, "\nChoice [1-{}]: ", options.len())?;

        let answer = self.read_answer()?;
        if answer.is_empty() {
            return Ok(default);
        }
        answer
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=options.len()).contains(n))
            .map(|n| n - 1)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, answer))
    }

    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        write!(self.output, "{question} [y/N]: ")?;
        let answer = self.read_answer()?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}
