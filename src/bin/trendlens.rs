use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use trendlens::compression::compress::CompressionType;
use trendlens::core::dates::parse_date;
use trendlens::ingest::builder::{build_kind, BuildOptions};
use trendlens::ingest::rollup::rollup_kind;
use trendlens::storage::layout::StorageLayout;
use trendlens::{Config, ErrorKind, Kind, Result, TrendService, WindowRequest};

#[derive(Debug, Parser)]
#[command(author, version, about = "Daily trending list analytics")]
struct Cli {
    #[arg(long, help = "Log at debug level unless RUST_LOG says otherwise")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compact the JSON archive into columnar segments
    Build {
        #[arg(long, default_value = "archive", help = "Archive root directory")]
        archive: PathBuf,
        #[arg(long, default_value = "analytics", help = "Analytics output directory")]
        analytics: PathBuf,
        #[arg(long)]
        kind: Kind,
        #[arg(long, value_parser = parse_year, help = "Only build this year")]
        year: Option<i32>,
        #[arg(long, help = "Rewrite the year instead of appending new dates")]
        rebuild_year: bool,
        #[arg(long, default_value = "lz4")]
        compression: CompressionType,
    },
    /// Derive day presence rollups from the columnar segments
    Rollup {
        #[arg(long, default_value = "analytics")]
        analytics: PathBuf,
        #[arg(long)]
        kind: Kind,
        #[arg(long, help = "Rebuild rollups from this date's year (YYYY-MM-DD)")]
        from_date: Option<String>,
        #[arg(long, default_value = "lz4")]
        compression: CompressionType,
    },
    /// Known dates of a kind
    Dates {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        kind: String,
    },
    /// One daily list
    Day {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        date: String,
        #[arg(long, help = "Language, or __all__ (default)")]
        language: Option<String>,
    },
    /// Window leaderboards
    Top {
        #[command(flatten)]
        store: StoreArgs,
        #[command(subcommand)]
        board: Board,
    },
}

#[derive(Debug, Args)]
struct StoreArgs {
    #[arg(long, default_value = "analytics")]
    analytics: PathBuf,
    #[arg(long, help = "Answer from the columnar store only")]
    no_rollups: bool,
}

#[derive(Debug, Args)]
struct WindowArgs {
    #[arg(long)]
    start: String,
    #[arg(long)]
    end: String,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    include_all_languages: Option<String>,
    #[arg(long)]
    limit: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Board {
    Reappearing {
        #[arg(long)]
        kind: String,
        #[arg(long, help = "day (default) or occurrence")]
        presence: Option<String>,
        #[command(flatten)]
        window: WindowArgs,
    },
    Owners {
        #[command(flatten)]
        window: WindowArgs,
    },
    Languages {
        #[arg(long, help = "Both kinds when absent")]
        kind: Option<String>,
        #[command(flatten)]
        window: WindowArgs,
    },
    Streaks {
        #[arg(long)]
        kind: String,
        #[command(flatten)]
        window: WindowArgs,
    },
    Newcomers {
        #[arg(long)]
        kind: String,
        #[command(flatten)]
        window: WindowArgs,
    },
}

fn parse_year(value: &str) -> std::result::Result<i32, String> {
    if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("Invalid year: {}", value));
    }
    value.parse().map_err(|_| format!("Invalid year: {}", value))
}

impl WindowArgs {
    fn request<'a>(&'a self, kind: Option<&'a str>, presence: Option<&'a str>) -> WindowRequest<'a> {
        WindowRequest {
            kind,
            start: &self.start,
            end: &self.end,
            language: self.language.as_deref(),
            presence,
            include_all_languages: self.include_all_languages.as_deref(),
            limit: self.limit.as_deref(),
        }
    }
}

fn open_service(store: &StoreArgs) -> Result<TrendService> {
    let config = Config {
        use_rollups: !store.no_rollups,
        ..Config::with_root(&store.analytics)
    };
    TrendService::open(&config)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Build { archive, analytics, kind, year, rebuild_year, compression } => {
            let layout = StorageLayout::create(&analytics)?;
            let options = BuildOptions { year, rebuild_year, compression };
            let result = build_kind(&archive, &layout, kind, &options)?;
            tracing::info!(
                kind = %result.kind,
                years = ?result.years_built,
                rows = result.rows_written,
                duplicates = result.duplicates_dropped,
                manifest = %result.manifest_path.display(),
                "build finished"
            );
            Ok(())
        }
        Command::Rollup { analytics, kind, from_date, compression } => {
            let from_date = from_date.as_deref().map(parse_date).transpose()?;
            let layout = StorageLayout::new(&analytics);
            let result = rollup_kind(&layout, kind, from_date, compression)?;
            tracing::info!(
                kind = %result.kind,
                years = ?result.years_built,
                rows = result.rows_written,
                "rollup finished"
            );
            Ok(())
        }
        Command::Dates { store, kind } => print_json(&*open_service(&store)?.list_dates(&kind)?),
        Command::Day { store, kind, date, language } => {
            let service = open_service(&store)?;
            print_json(&*service.day(&kind, &date, language.as_deref())?)
        }
        Command::Top { store, board } => {
            let service = open_service(&store)?;
            let output = match &board {
                Board::Reappearing { kind, presence, window } => service
                    .top_reappearing(&window.request(Some(kind.as_str()), presence.as_deref()))?,
                Board::Owners { window } => service.top_owners(&window.request(None, None))?,
                Board::Languages { kind, window } => {
                    service.top_languages(&window.request(kind.as_deref(), None))?
                }
                Board::Streaks { kind, window } => {
                    service.top_streaks(&window.request(Some(kind.as_str()), None))?
                }
                Board::Newcomers { kind, window } => {
                    service.top_newcomers(&window.request(Some(kind.as_str()), None))?
                }
            };
            print_json(&*output)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(if cli.verbose { Level::DEBUG.into() } else { Level::INFO.into() })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            if e.kind == ErrorKind::InvalidRequest {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}
