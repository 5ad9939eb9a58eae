//! Terminal output for the kiln CLI.
//!
//! Cargo-style status lines with right-aligned coloured verbs, written to
//! stderr so stdout stays machine-readable. Colour is enabled only when
//! stderr is a terminal.

use std::io::{self, IsTerminal, Write};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Width for the right-aligned verb column.
const VERB_WIDTH: usize = 12;

/// Terminal-aware status printer.
pub struct Printer {
    color: bool,
}

impl Printer {
    pub fn new() -> Self {
        Self {
            color: io::stderr().is_terminal(),
        }
    }

    /// Print a status line with a green bold verb, indented by `depth`
    /// scope levels. e.g. "   Composing characters (4 sprites)"
    pub fn status(&self, verb: &str, message: &str, depth: usize) {
        self.print_line(GREEN, verb, message, depth);
    }

    /// Print an informational line with a cyan bold verb.
    pub fn info(&self, verb: &str, message: &str, depth: usize) {
        self.print_line(CYAN, verb, message, depth);
    }

    /// Print a warning line with a yellow bold verb.
    pub fn warning(&self, verb: &str, message: &str, depth: usize) {
        self.print_line(YELLOW, verb, message, depth);
    }

    /// Print an error line with a red bold verb.
    pub fn error(&self, verb: &str, message: &str, depth: usize) {
        self.print_line(RED, verb, message, depth);
    }

    /// Format a string as dim/grey.
    pub fn dim(&self, text: &str) -> String {
        if self.color {
            format!("{DIM}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn print_line(&self, color: &str, verb: &str, message: &str, depth: usize) {
        let mut stderr = io::stderr().lock();
        let indent = "  ".repeat(depth);
        if self.color {
            let _ = writeln!(
                stderr,
                "{BOLD}{color}{verb:>VERB_WIDTH$}{RESET} {indent}{message}"
            );
        } else {
            let _ = writeln!(stderr, "{verb:>VERB_WIDTH$} {indent}{message}");
        }
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pluralize a count: `plural(1, "sheet", "sheets")` → "1 sheet".
pub fn plural(n: usize, singular: &str, pluralized: &str) -> String {
    if n == 1 {
        format!("{} {}", n, singular)
    } else {
        format!("{} {}", n, pluralized)
    }
}

/// Return a relative display path when possible, absolute otherwise.
pub fn display_path(path: &std::path::Path) -> String {
    if let Ok(cwd) = std::env::current_dir() {
        if let Ok(relative) = path.strip_prefix(&cwd) {
            let s = relative.display().to_string();
            if s.is_empty() {
                return ".".to_string();
            }
            return s;
        }
    }
    path.display().to_string()
}
