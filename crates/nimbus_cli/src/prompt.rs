//! Terminal prompts.

use std::io::{self, BufRead, Write};

use nimbus_core::Prompter;

/// Asks on stdout and reads one line from stdin.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt(&self, message: &str) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(message.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}
