//! Terminal output for CLI handlers.
//!
//! Human-readable lines go through [`emit`], which applies `--quiet` and the
//! `--color` override in one place. With `--json` a command prints a single
//! document through [`document`]; the line helpers then stay silent, except
//! warnings and errors, which become `{"level": .., "message": ..}` objects.

use std::fmt::Display;

use owo_colors::{OwoColorize, Stream};
use parking_lot::RwLock;
use serde_json::json;

/// Output mode selected by the global flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }
}

static OUTPUT: RwLock<OutputConfig> = parking_lot::const_rwlock(OutputConfig::new(false, false));

/// Apply the global flags. Call once, before any handler runs.
pub fn configure(config: OutputConfig) {
    *OUTPUT.write() = config;
}

#[must_use]
pub fn is_json() -> bool {
    OUTPUT.read().json
}

#[must_use]
pub fn is_quiet() -> bool {
    OUTPUT.read().quiet
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Plain,
    Success,
    Note,
    Hint,
    Warning,
    Error,
}

impl Tone {
    /// Survives `--quiet`, and is still reported under `--json`.
    const fn is_alert(self) -> bool {
        matches!(self, Tone::Warning | Tone::Error)
    }

    const fn level(self) -> &'static str {
        match self {
            Tone::Warning => "warning",
            Tone::Error => "error",
            _ => "info",
        }
    }
}

fn render(tone: Tone, message: &str, stream: Stream) -> String {
    match tone {
        Tone::Plain => format!("  {message}"),
        Tone::Success => format!("  {} {message}", "✓".if_supports_color(stream, |t| t.green())),
        Tone::Note => format!("  {}", message.if_supports_color(stream, |t| t.dimmed())),
        Tone::Hint => format!(
            "  {}: {}",
            "hint".if_supports_color(stream, |t| t.cyan()),
            message.if_supports_color(stream, |t| t.dimmed())
        ),
        Tone::Warning => format!("  {} {message}", "⚠".if_supports_color(stream, |t| t.yellow())),
        Tone::Error => format!("  {} {message}", "×".if_supports_color(stream, |t| t.red())),
    }
}

fn emit(tone: Tone, message: &str) {
    let config = *OUTPUT.read();

    if config.json {
        if tone.is_alert() {
            eprintln!("{}", json!({ "level": tone.level(), "message": message }));
        }
        return;
    }
    if config.quiet && !tone.is_alert() {
        return;
    }

    if tone == Tone::Error {
        eprintln!("{}", render(tone, message, Stream::Stderr));
    } else {
        println!("{}", render(tone, message, Stream::Stdout));
    }
}

/// Print a bold section title preceded by a blank line.
pub fn section(title: &str) {
    let config = *OUTPUT.read();
    if config.json || config.quiet {
        return;
    }
    println!();
    println!("{}", title.if_supports_color(Stream::Stdout, |t| t.bold()));
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let label = format!("{label:<14}");
    let line = format!(
        "{} {value}",
        label.if_supports_color(Stream::Stdout, |t| t.dimmed())
    );
    emit(Tone::Plain, &line);
}

pub fn success(message: &str) {
    emit(Tone::Success, message);
}

pub fn note(message: &str) {
    emit(Tone::Note, message);
}

pub fn hint(message: &str) {
    emit(Tone::Hint, message);
}

/// Shown even with `--quiet`.
pub fn warning(message: &str) {
    emit(Tone::Warning, message);
}

/// Printed to stderr.
pub fn error(message: &str) {
    emit(Tone::Error, message);
}

/// Print a rendered `tabled` table, indented to line up with fields.
pub fn table(table: impl Display) {
    for row in table.to_string().lines() {
        emit(Tone::Plain, row);
    }
}

/// Print the command's JSON document on one line.
pub fn document(value: serde_json::Value) {
    println!("{value}");
}

/// `value` in cyan, or unstyled when colors are off.
pub fn highlight(value: impl Display) -> String {
    let value = value.to_string();
    format!("{}", value.if_supports_color(Stream::Stdout, |t| t.cyan()))
}
