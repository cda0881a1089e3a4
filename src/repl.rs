//! REPL (Read-Eval-Print Loop) for fmvars
//!
//! Evaluates expressions against a loaded record and shows both the value and
//! its rendered HTML.

use crate::cli::format_value;
use crate::frontmatter::load_record;
use crate::functions;
use crate::render::{render_html, RenderOptions};
use crate::value::Record;
use crate::Evaluator;
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::{history::FileHistory, CompletionType, Config, Editor};
use std::path::{Path, PathBuf};

/// What the loop should do after a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Output(String),
    Quit,
}

/// REPL state: the record in scope and display settings
pub struct Session {
    record: Record,
    options: RenderOptions,
    show_prefix: bool,
}

impl Session {
    pub fn new(record: Record, options: RenderOptions) -> Self {
        Self {
            record,
            options,
            show_prefix: false,
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Handle one line of input
    pub fn handle(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        if line.is_empty() {
            return Outcome::Continue;
        }
        if let Some(command) = line.strip_prefix(':') {
            return self.command(command);
        }

        let value = Evaluator::new(&self.record).evaluate_str(line);
        let html = render_html(&value, Some(line), self.show_prefix, &self.options);
        Outcome::Output(format!(
            "{}\n{} {}",
            format_value(&value),
            "html:".dimmed(),
            html
        ))
    }

    fn command(&mut self, command: &str) -> Outcome {
        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        match name {
            "quit" | "q" | "exit" => Outcome::Quit,
            "help" | "h" => Outcome::Output(help_text()),
            "fields" | "f" => Outcome::Output(self.fields_text()),
            "functions" => Outcome::Output(functions::registry().list_functions().join(", ")),
            "prefix" | "p" => {
                self.show_prefix = !self.show_prefix;
                let state = if self.show_prefix { "on" } else { "off" };
                Outcome::Output(format!("{} labels {}", "✓".green(), state))
            }
            "load" | "l" if !argument.is_empty() => match load_record(argument) {
                Ok(record) => {
                    let count = record.len();
                    self.record = record;
                    Outcome::Output(format!(
                        "{} loaded {} field(s) from {}",
                        "✓".green(),
                        count,
                        argument
                    ))
                }
                Err(e) => Outcome::Output(format!("{} {}", "✗".red().bold(), e)),
            },
            "load" | "l" => Outcome::Output(format!("{} usage: :load <file>", "✗".red().bold())),
            "clear" | "c" => {
                self.record = Record::new();
                Outcome::Output(format!("{} record cleared", "✓".green()))
            }
            _ => Outcome::Output(format!(
                "{} :{}\n{}",
                "Unknown command:".red(),
                command,
                "Type :help for available commands".dimmed()
            )),
        }
    }

    fn fields_text(&self) -> String {
        if self.record.is_empty() {
            return "No fields loaded".dimmed().to_string();
        }
        self.record
            .iter()
            .map(|(key, value)| format!("  {} = {}", key.green(), format_value(value)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run the interactive REPL, optionally starting with a record file
pub fn run_repl(file: Option<&Path>, options: RenderOptions) -> Result<()> {
    println!("{}", format!("fmvars REPL v{}", crate::VERSION).cyan().bold());
    println!("{}", "Type :help for help, :quit to exit".dimmed());
    println!();

    let record = match file {
        Some(path) => load_record(path)?,
        None => Record::new(),
    };
    let mut session = Session::new(record, options);

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), FileHistory> = Editor::with_config(config)?;

    let history_path = history_path();
    if let Some(path) = &history_path {
        let _ = rl.load_history(path); // May not exist yet
    }

    loop {
        let prompt = format!("fmvars({}) ", session.record().len()).green().bold().to_string();
        match rl.readline(&prompt) {
            Ok(line) => match session.handle(&line) {
                Outcome::Continue => {}
                Outcome::Output(text) => println!("{}", text),
                Outcome::Quit => {
                    println!("{}", "Goodbye!".cyan());
                    break;
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                println!("{}", "Use :quit to exit".dimmed());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red().bold(), err);
                break;
            }
        }
    }

    if let Some(path) = history_path {
        let _ = rl.save_history(&path);
    }

    Ok(())
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fmvars_history"))
}

fn help_text() -> String {
    let mut out = Vec::new();
    out.push("fmvars REPL Commands:".cyan().bold().to_string());
    out.push(format!("  {}  - Show this help message", ":help, :h".green()));
    out.push(format!("  {}  - Exit the REPL", ":quit, :q, :exit".green()));
    out.push(format!("  {}  - Show the loaded fields", ":fields, :f".green()));
    out.push(format!("  {}  - Load fields from a file", ":load <file>".green()));
    out.push(format!("  {}  - Drop all fields", ":clear, :c".green()));
    out.push(format!("  {}  - Toggle field labels", ":prefix, :p".green()));
    out.push(format!("  {}  - List built-in functions", ":functions".green()));
    out.push(String::new());
    out.push("Examples:".cyan().bold().to_string());
    out.push(format!("  {}", "upper(firstname) + lastname".dimmed()));
    out.push(format!("  {}", "join(lowest(scores, 5, 25))".dimmed()));
    out.push(format!("  {}", "friends - Bob".dimmed()));
    out.join("\n")
}
