use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use recall_monitor::app::{App, ListRequest, SearchRequest};
use recall_monitor::cache::FreshnessCache;
use recall_monitor::config::{ConfigLoader, Settings};
use recall_monitor::cpsc::{CpscClient, CpscHttpClient};
use recall_monitor::error::RecallError;
use recall_monitor::fda::{FdaClient, FdaHttpClient};
use recall_monitor::output::JsonOutput;

#[derive(Parser)]
#[command(name = "recall-monitor")]
#[command(about = "Aggregate FDA and CPSC product recalls into one canonical feed")]
#[command(version)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Request(Request),
    #[command(about = "Read one command per line from stdin, sharing a single cache")]
    Shell,
}

#[derive(Subcommand, Clone)]
enum Request {
    #[command(about = "List recalls with optional filters")]
    List(ListArgs),
    #[command(about = "Summary statistics over both sources")]
    Stats,
    #[command(about = "Keyword search across both sources")]
    Search(SearchArgs),
    #[command(about = "Clear the cache and refetch both sources")]
    Refresh,
    #[command(about = "Check upstream reachability and cache validity")]
    Probe,
}

#[derive(Args, Clone)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,

    #[arg(long)]
    classification: Option<String>,

    #[arg(long)]
    source: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    limit: Option<String>,
}

#[derive(Args, Clone)]
struct SearchArgs {
    query: Vec<String>,

    #[arg(long)]
    source: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    limit: Option<String>,
}

#[derive(Parser)]
#[command(name = "shell", no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    #[command(flatten)]
    Request(Request),
    #[command(alias = "exit")]
    Quit,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<RecallError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &RecallError) -> u8 {
    if error.is_rejected_request() { 2 } else { 1 }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = ConfigLoader::resolve(cli.config.as_deref())?;
    let app = build_app(settings)?;

    match cli.command {
        Commands::Request(request) => execute(&app, request),
        Commands::Shell => run_shell(&app),
    }
}

fn build_app(settings: Settings) -> Result<App<FdaHttpClient, CpscHttpClient>, RecallError> {
    let fda = FdaHttpClient::new(&settings)?;
    let cpsc = CpscHttpClient::new(&settings)?;
    Ok(App::new(settings, Arc::new(FreshnessCache::new()), fda, cpsc))
}

fn execute<F: FdaClient, C: CpscClient>(app: &App<F, C>, request: Request) -> miette::Result<()> {
    match request {
        Request::List(args) => {
            let request = ListRequest::parse(
                args.search.as_deref(),
                args.classification.as_deref(),
                args.source.as_deref(),
                args.limit.as_deref(),
                app.settings(),
            )?;
            JsonOutput::print_recalls(&app.list_recalls(&request)).into_diagnostic()
        }
        Request::Stats => JsonOutput::print_stats(&app.stats()).into_diagnostic(),
        Request::Search(args) => {
            let query = args.query.join(" ");
            let request = SearchRequest::parse(
                Some(&query),
                args.source.as_deref(),
                args.limit.as_deref(),
                app.settings(),
            )?;
            JsonOutput::print_search(&app.search(&request)).into_diagnostic()
        }
        Request::Refresh => JsonOutput::print_refresh(&app.refresh()).into_diagnostic(),
        Request::Probe => JsonOutput::print_probe(&app.probe()).into_diagnostic(),
    }
}

fn run_shell<F: FdaClient, C: CpscClient>(app: &App<F, C>) -> miette::Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.into_diagnostic()?;
        let words = split_words(&line);
        if words.is_empty() {
            continue;
        }
        let parsed = match ShellLine::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match parsed.command {
            ShellCommand::Quit => break,
            ShellCommand::Request(request) => {
                if let Err(report) = execute(app, request) {
                    eprintln!("{report:?}");
                }
            }
        }
    }
    Ok(())
}

/// Whitespace split that keeps double-quoted phrases together.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            ch if ch.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            ch => {
                current.push(ch);
                pending = true;
            }
        }
    }
    if pending {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_words_keeps_quoted_phrases() {
        assert_eq!(
            split_words(r#"search "peanut butter" --limit 5"#),
            vec!["search", "peanut butter", "--limit", "5"]
        );
        assert!(split_words("   ").is_empty());
    }

    #[test]
    fn shell_line_parses_requests() {
        let parsed =
            ShellLine::try_parse_from(["list", "--source", "fda", "--limit", "-1"]).unwrap();
        let ShellCommand::Request(Request::List(args)) = parsed.command else {
            panic!("expected a list request");
        };
        assert_eq!(args.source.as_deref(), Some("fda"));
        assert_eq!(args.limit.as_deref(), Some("-1"));

        let parsed = ShellLine::try_parse_from(["exit"]).unwrap();
        assert!(matches!(parsed.command, ShellCommand::Quit));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(map_exit_code(&RecallError::EmptyQuery), 2);
        assert_eq!(map_exit_code(&RecallError::ConfigParse("x".to_string())), 1);
    }
}
