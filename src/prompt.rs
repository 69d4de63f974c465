use std::io::{self, BufRead, Write};

pub const CONTINUATION_PROMPT: &str = "> ";

pub struct ShellPrompt {
    prompt: String,
}

impl ShellPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        ShellPrompt { prompt: prompt.into() }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Read one logical line: a physical line ending in an unescaped
    /// backslash is joined with the next one. `None` means EOF before any input.
    pub fn read_logical_line<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> io::Result<Option<String>> {
        let mut logical = String::new();
        let mut prompt = self.prompt.as_str();
        loop {
            write!(output, "{}", prompt)?;
            output.flush()?;

            let mut buf = String::new();
            if input.read_line(&mut buf)? == 0 {
                // EOF (e.g., Ctrl-D)
                writeln!(output)?;
                if logical.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(logical));
            }
            let line = buf.trim_end_matches(['\n', '\r']);
            match line.strip_suffix('\\') {
                Some(head) if ends_unescaped(line) => {
                    logical.push_str(head);
                    prompt = CONTINUATION_PROMPT;
                }
                _ => {
                    logical.push_str(line);
                    return Ok(Some(logical));
                }
            }
        }
    }
}

// An odd run of trailing backslashes leaves the last one unescaped.
fn ends_unescaped(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}
