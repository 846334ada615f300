//! User-facing console output.
//! Colored prefixes only when the stream is a TTY; logs go through tracing and
//! stay separate from these lines.

use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

fn stdout_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

fn stderr_tty() -> bool {
    atty::is(atty::Stream::Stderr)
}

pub fn print_info(msg: &str) {
    if stdout_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {msg}");
    }
}

pub fn print_warn(msg: &str) {
    if stderr_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {msg}");
    }
}

pub fn print_error(msg: &str) {
    if stderr_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {msg}");
    }
}

pub fn print_success(msg: &str) {
    if stdout_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {msg}");
    }
}

/// One progress line per workflow phase.
pub fn print_step(msg: &str) {
    if stdout_tty() {
        println!("{} {}", "==>".blue().bold(), msg);
    } else {
        println!("==> {msg}");
    }
}

/// Plain line without prefix, for output users may script against.
pub fn print_user(msg: &str) {
    println!("{msg}");
}

/// True when a human can answer prompts.
pub fn interactive() -> bool {
    atty::is(atty::Stream::Stdin) && stdout_tty()
}

/// Ask a question on the terminal and return the trimmed, lowercased answer.
/// `None` when stdin is closed.
pub fn ask(question: &str) -> Option<String> {
    print!("{} {question} ", "?".magenta().bold());
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_ascii_lowercase()),
    }
}

/// Yes/no prompt; anything but an explicit yes is no.
pub fn confirm(question: &str) -> bool {
    matches!(ask(&format!("{question} [y/N]")).as_deref(), Some("y" | "yes"))
}
