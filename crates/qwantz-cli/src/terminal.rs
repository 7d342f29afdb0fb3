//! Colored terminal output.

use std::io::{self, IsTerminal, Write};

use codespan_reporting::term::termcolor;
use qwantz::diag::{Diagnostic, Severity};
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

/// A handle to the optionally colored stderr stream.
pub fn err(choice: clap::ColorChoice) -> StandardStream {
    let choice = match choice {
        clap::ColorChoice::Auto if io::stderr().is_terminal() => {
            termcolor::ColorChoice::Auto
        }
        clap::ColorChoice::Always => termcolor::ColorChoice::Always,
        _ => termcolor::ColorChoice::Never,
    };
    StandardStream::stderr(choice)
}

/// Print one diagnostic with a colored severity label.
pub fn print_diagnostic(
    out: &mut StandardStream,
    source: &str,
    diagnostic: &Diagnostic,
) -> io::Result<()> {
    let (label, color) = match diagnostic.severity {
        Severity::Error => ("error", Color::Red),
        Severity::Warning => ("warning", Color::Yellow),
        Severity::Info => ("info", Color::Cyan),
    };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{label}")?;
    out.reset()?;
    writeln!(out, ": {source}: {diagnostic}")
}

/// Print a fatal error for one input.
pub fn print_error(
    out: &mut StandardStream,
    source: &str,
    error: &dyn std::fmt::Display,
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    write!(out, "error")?;
    out.reset()?;
    writeln!(out, ": {source}: {error}")
}
