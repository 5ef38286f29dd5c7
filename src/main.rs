use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use docedit::tree::NamedStyle;
use docedit::{Config, MemoryService, ReplaceSection, Session};

#[derive(Parser)]
#[command(name = "docedit")]
#[command(about = "Read and edit structured documents as Markdown")]
struct Cli {
    /// JSON file holding the documents
    #[arg(long, global = true, default_value = "docedit-store.json")]
    store: PathBuf,

    /// TOML config file (defaults are used when missing)
    #[arg(long, global = true, default_value = "docedit.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a document as Markdown
    Read {
        document: String,
        #[arg(long)]
        tab: Option<String>,
    },
    /// Replace a document's content with Markdown
    Write {
        document: String,
        /// Markdown file (reads stdin when omitted)
        input: Option<PathBuf>,
        #[arg(long)]
        tab: Option<String>,
    },
    /// List headings with their index ranges
    Headings {
        document: String,
        #[arg(long)]
        tab: Option<String>,
    },
    /// Insert Markdown directly below a heading
    InsertAfter {
        document: String,
        heading: String,
        content: String,
        /// Named style for inserted paragraphs, e.g. NORMAL_TEXT
        #[arg(long)]
        style: Option<NamedStyle>,
        #[arg(long)]
        tab: Option<String>,
    },
    /// Replace the content of a section
    ReplaceSection {
        document: String,
        heading: String,
        content: String,
        /// Replace up to this heading instead of the next one
        #[arg(long)]
        until: Option<String>,
        /// Replace the heading itself too
        #[arg(long)]
        replace_heading: bool,
        #[arg(long)]
        style: Option<NamedStyle>,
        #[arg(long)]
        tab: Option<String>,
    },
    /// Append Markdown at the end of a section
    Append {
        document: String,
        heading: String,
        content: String,
        #[arg(long)]
        style: Option<NamedStyle>,
        #[arg(long)]
        tab: Option<String>,
    },
    /// Show text styles over an index range
    StyleAt {
        document: String,
        start: usize,
        end: Option<usize>,
        #[arg(long)]
        tab: Option<String>,
    },
    /// List the tabs of a document
    Tabs { document: String },
    /// Create an empty document
    Create { title: String },
    /// Delete a document
    Delete { document: String },
    /// Find documents by title
    Search {
        #[arg(default_value = "")]
        query: String,
    },
}

impl Command {
    fn modifies_store(&self) -> bool {
        !matches!(
            self,
            Command::Read { .. }
                | Command::Headings { .. }
                | Command::StyleAt { .. }
                | Command::Tabs { .. }
                | Command::Search { .. }
        )
    }
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load(&cli.config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let service = match MemoryService::open(&cli.store) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error reading {}: {}", cli.store.display(), e);
            std::process::exit(1);
        }
    };

    let modifies_store = cli.command.modifies_store();
    let result = run(&Session::new(&service, &config), cli.command);

    // Partial writes are kept, so the store is saved even after a failure.
    if modifies_store && let Err(e) = service.save(&cli.store) {
        eprintln!("Error writing {}: {}", cli.store.display(), e);
        std::process::exit(1);
    }

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(session: &Session, command: Command) -> Result<String, Box<dyn Error>> {
    match command {
        Command::Read { document, tab } => Ok(session.read_as_markdown(&document, tab.as_deref())?),
        Command::Write {
            document,
            input,
            tab,
        } => {
            let markdown = match input {
                Some(path) => fs::read_to_string(path)?,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            json(&session.write_markdown(&document, &markdown, tab.as_deref())?)
        }
        Command::Headings { document, tab } => {
            json(&session.find_headings(&document, tab.as_deref())?)
        }
        Command::InsertAfter {
            document,
            heading,
            content,
            style,
            tab,
        } => json(&session.insert_after_heading(
            &document,
            &heading,
            &content,
            style,
            tab.as_deref(),
        )?),
        Command::ReplaceSection {
            document,
            heading,
            content,
            until,
            replace_heading,
            style,
            tab,
        } => {
            let request = ReplaceSection {
                end_heading: until,
                preserve_heading: !replace_heading,
                style,
                ..ReplaceSection::new(heading, content)
            };
            json(&session.replace_section(&document, &request, tab.as_deref())?)
        }
        Command::Append {
            document,
            heading,
            content,
            style,
            tab,
        } => json(&session.append_to_section(
            &document,
            &heading,
            &content,
            style,
            tab.as_deref(),
        )?),
        Command::StyleAt {
            document,
            start,
            end,
            tab,
        } => json(&session.get_style_at(&document, start, end, tab.as_deref())?),
        Command::Tabs { document } => json(&session.list_tabs(&document)?),
        Command::Create { title } => json(&session.create_document(&title)?),
        Command::Delete { document } => {
            session.delete_document(&document)?;
            Ok(format!("Deleted {}", document))
        }
        Command::Search { query } => json(&session.search_documents(&query)?),
    }
}

fn json(value: &impl Serialize) -> Result<String, Box<dyn Error>> {
    Ok(serde_json::to_string_pretty(value)?)
}
