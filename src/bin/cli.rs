//! page-snapshot CLI
//!
//! Snapshots a page and prints its indexed elements, records the fingerprint
//! of one element, or re-locates a recorded element in a fresh snapshot.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use page_snapshot::browser::{BrowserSession, ConnectionOptions, LaunchOptions};
use page_snapshot::dom::{SnapshotOptions, ViewportExpansion};
use page_snapshot::history::HistoryElement;
use std::path::PathBuf;

const DEFAULT_ATTRIBUTES: &str = "id,name,type,role,aria-label,placeholder,title,href,value";

#[derive(Parser)]
#[command(name = "page-snapshot")]
#[command(version)]
#[command(about = "Addressable DOM snapshots for browser agents", long_about = None)]
struct Cli {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H', global = true)]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH", global = true)]
    executable_path: Option<PathBuf>,

    /// WebSocket endpoint URL of a running browser
    #[arg(long, value_name = "URL", global = true)]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR", global = true)]
    user_data_dir: Option<PathBuf>,

    /// Pixels around the viewport that still count as in view (-1 = whole page)
    #[arg(long, short = 'e', default_value = "0", allow_hyphen_values = true, value_parser = parse_expansion, global = true)]
    viewport_expansion: ViewportExpansion,

    /// Do not draw highlight overlays in the page
    #[arg(long, global = true)]
    no_highlight: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the indexed elements of a page
    Snapshot {
        url: String,

        /// Print the full snapshot as JSON instead of the element listing
        #[arg(long)]
        json: bool,

        /// Comma-separated attributes shown in the listing
        #[arg(long, value_delimiter = ',', default_value = DEFAULT_ATTRIBUTES)]
        attributes: Vec<String>,
    },

    /// Print the history record of the element carrying an index
    Record {
        url: String,

        #[arg(long)]
        index: usize,

        /// Also write the record to this file
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Find a recorded element in a fresh snapshot and print its current index
    Locate {
        url: String,

        /// History record written by `record`
        #[arg(long, value_name = "FILE")]
        history: PathBuf,
    },
}

fn parse_expansion(value: &str) -> Result<ViewportExpansion, String> {
    let pixels: i64 = value.parse().map_err(|e| format!("invalid viewport expansion '{}': {}", value, e))?;
    ViewportExpansion::try_from(pixels)
}

impl Cli {
    fn session(&self) -> anyhow::Result<BrowserSession> {
        if let Some(ref endpoint) = self.ws_endpoint {
            log::info!("Connecting to {}", endpoint);
            return Ok(BrowserSession::connect(ConnectionOptions::new(endpoint.clone()))?);
        }

        let mut options = LaunchOptions::new().headless(!self.headed);
        if let Some(ref path) = self.executable_path {
            options = options.chrome_path(path.clone());
        }
        if let Some(ref dir) = self.user_data_dir {
            options = options.user_data_dir(dir.clone());
        }
        Ok(BrowserSession::launch(options)?)
    }

    fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions::new()
            .highlight_elements(!self.no_highlight)
            .viewport_expansion(self.viewport_expansion)
    }
}

fn open(session: &BrowserSession, url: &str) -> anyhow::Result<()> {
    session.navigate(url)?;
    session.wait_for_navigation()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let session = cli.session().context("Failed to start browser session")?;
    let options = cli.snapshot_options();

    match &cli.command {
        Command::Snapshot { url, json, attributes } => {
            open(&session, url)?;
            let tree = session.snapshot(&options)?;
            if *json {
                println!("{}", tree.to_json()?);
            } else {
                let attributes: Vec<&str> = attributes.iter().map(String::as_str).collect();
                println!("{}", tree.clickable_elements_to_string(&attributes));
            }
        }
        Command::Record { url, index, output } => {
            open(&session, url)?;
            let tree = session.snapshot(&options)?;
            let Some(record) = tree.history_element(*index) else {
                bail!("No element with index {} ({} indexed)", index, tree.count_interactive());
            };
            let json = record.to_json()?;
            if let Some(path) = output {
                std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
            }
            println!("{}", json);
        }
        Command::Locate { url, history } => {
            let json = std::fs::read_to_string(history)
                .with_context(|| format!("Failed to read {}", history.display()))?;
            let record = HistoryElement::from_json(&json)?;

            open(&session, url)?;
            let tree = session.snapshot(&options)?;
            match tree
                .find_history_element(&record)
                .and_then(|id| tree.element(id))
                .and_then(|element| element.highlight_index)
            {
                Some(index) => println!("{}", index),
                None => println!("not found"),
            }
        }
    }

    session.close()?;
    Ok(())
}
