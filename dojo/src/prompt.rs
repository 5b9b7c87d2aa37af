//! Interactive questions on stdin

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

fn read_answer(question: &str) -> Result<Option<String>> {
    print!(" {} ", question);
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    if read == 0 {
        // EOF: no one is answering
        println!();
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask a yes/no question. An empty answer or closed stdin picks `default`.
pub fn confirm(question: &str, default: bool, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = read_answer(&format!("{} {}", question, hint))?;
    Ok(match answer.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("") => default,
        Some("y") | Some("yes") => true,
        _ => false,
    })
}

/// Ask for a numbered choice. An empty answer means the first entry.
pub fn choose(question: &str) -> Result<String> {
    let answer = read_answer(&format!("{} [1]", question))?;
    Ok(match answer {
        Some(a) if !a.is_empty() => a,
        _ => "1".to_string(),
    })
}
