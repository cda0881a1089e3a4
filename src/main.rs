//! fmvars CLI - evaluate and render frontmatter expressions

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use fmvars::error::format_template_error;
use fmvars::{cli, frontmatter, Config, Error, Evaluator, MarkdownProvider, Record, RenderOptions};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fmvars")]
#[command(about = "Frontmatter variables - evaluate and render document fields", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./fmvars.toml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression and print the value
    Eval {
        /// Expression, e.g. "upper(firstname) + lastname"
        expression: String,

        /// Markdown, YAML or JSON file supplying the fields
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Print the value as JSON
        #[arg(long, conflicts_with = "html")]
        json: bool,

        /// Print the rendered HTML instead of the value
        #[arg(long)]
        html: bool,

        /// Include the field label (implies --html)
        #[arg(long)]
        prefix: bool,
    },

    /// Parse an expression and print its syntax tree as JSON
    Parse {
        /// Expression to parse
        expression: String,
    },

    /// Render the placeholders of markdown documents
    Render {
        /// Documents or glob patterns
        #[arg(required = true, value_name = "FILE")]
        files: Vec<String>,

        /// Print each placeholder's node tree as JSON
        #[arg(long)]
        tree: bool,

        /// Render links to documents missing beside the file as broken links
        #[arg(long)]
        check_links: bool,
    },

    /// List the built-in functions
    Functions,

    /// Start interactive REPL (Read-Eval-Print Loop)
    Repl {
        /// File supplying the fields
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Re-render a document whenever it changes
    Watch {
        /// Markdown document to watch
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::discover(cli.config.as_deref()).context("Failed to load configuration")?;
    let options = config.render_options();

    match cli.command {
        Commands::Eval {
            expression,
            file,
            json,
            html,
            prefix,
        } => {
            let record = load_fields(file.as_deref())?;
            let value = Evaluator::new(&record).evaluate_str(&expression);
            if json {
                println!("{}", serde_json::to_string(&value)?);
            } else if html || prefix {
                println!(
                    "{}",
                    fmvars::render::render_html(&value, Some(&expression), prefix, &options)
                );
            } else if !value.is_null() {
                println!("{}", value.to_text());
            }
        }

        Commands::Parse { expression } => {
            let ast = fmvars::parser::parse(&expression);
            println!("{}", serde_json::to_string_pretty(&ast)?);
        }

        Commands::Render {
            files,
            tree,
            check_links,
        } => {
            let paths = cli::expand_patterns(&files).context("Invalid file pattern")?;
            let mut errors = 0;
            for path in &paths {
                if paths.len() > 1 {
                    println!("{}", format!("==> {} <==", path.display()).bold());
                }
                if let Err(e) = render_path(path, tree, check_links, &options) {
                    cli::error(&format!("{}: {}", path.display(), e));
                    errors += 1;
                }
            }
            if errors > 0 {
                std::process::exit(1);
            }
        }

        Commands::Functions => {
            for name in fmvars::registry().list_functions() {
                println!("{}", name);
            }
        }

        Commands::Repl { file } => {
            fmvars::repl::run_repl(file.as_deref(), options)?;
        }

        Commands::Watch { file } => {
            cli::info(&format!(
                "Watching {} (Press Ctrl+C to stop)",
                file.display()
            ));
            fmvars::watch::watch_document(&file, &config, |rendered| {
                match rendered {
                    Ok(text) => {
                        println!("{}", "─".repeat(40).dimmed());
                        println!("{}", text);
                    }
                    Err(e) => cli::error(&e.to_string()),
                }
                ControlFlow::Continue(())
            })
            .with_context(|| format!("Failed to watch {}", file.display()))?;
        }
    }

    Ok(())
}

fn load_fields(file: Option<&Path>) -> Result<Record> {
    match file {
        Some(path) => frontmatter::load_record(path)
            .with_context(|| format!("Failed to load fields from {}", path.display())),
        None => Ok(Record::new()),
    }
}

fn render_path(
    path: &Path,
    tree: bool,
    check_links: bool,
    options: &RenderOptions,
) -> fmvars::Result<()> {
    let text = std::fs::read_to_string(path)?;
    let document = frontmatter::parse_document(&text)?;
    if !document.has_frontmatter {
        cli::warning(&format!(
            "{} has no frontmatter, fields render as their names",
            path.display()
        ));
    }
    let vault = MarkdownProvider::new(path.parent().unwrap_or_else(|| Path::new(".")));
    let exists = |target: &str| !check_links || vault.link_exists(target);

    let template = match fmvars::parse_template(&document.body) {
        Ok(template) => template,
        Err(Error::Template(e)) => {
            eprint!("{}", format_template_error(&e, &document.body));
            return Err(Error::Template(e));
        }
        Err(e) => return Err(e),
    };

    if tree {
        let mut rendered = template.render_placeholders(&document.record, options);
        for placeholder in &mut rendered {
            placeholder.fragment.mark_broken_links(exists);
        }
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        print!(
            "{}",
            template.render_with_links(&document.record, options, &exists)
        );
    }
    Ok(())
}
