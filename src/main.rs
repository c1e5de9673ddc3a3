use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{LevelFilter, info, warn};
use serde::Serialize;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use pdfink::config::Config;
use pdfink::error::{EngineError, EngineResult};
use pdfink::search::SearchMatch;
use pdfink::session::ViewerSession;

/// Open a PDF, materialize the pages around a position and optionally search
/// the extracted text.
#[derive(Debug, Parser)]
#[command(name = "pdf-ink", version)]
struct Cli {
    /// PDF file to open.
    path: PathBuf,
    /// Page to open at (clamped to the document).
    #[arg(long, default_value_t = 1)]
    page: i64,
    /// Query string of a deep link, e.g. "page=3&scale=1.5&rotation=90".
    #[arg(long)]
    link: Option<String>,
    /// Text to search for.
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    match_case: bool,
    /// Config file; defaults to the standard location.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log verbosity: error, warn, info, debug or trace.
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    page_count: usize,
    current_page: u32,
    scale: f32,
    rotation: u16,
    rendered_pages: Vec<u32>,
    pages_without_text: Vec<u32>,
    link: String,
    matches: &'a [SearchMatch],
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn init_logging(level: LevelFilter) {
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

const TEXT_WAIT: Duration = Duration::from_secs(10);
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

async fn run(cli: Cli) -> EngineResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let mut session = ViewerSession::open_path(&cli.path, config)?;

    session.go_to_page(cli.page);
    if let Some(link) = &cli.link {
        session.apply_deep_link(link);
    }
    let rendered = session.render_window();
    info!("rendered {} pages", rendered.len());
    wait_for_text(&mut session).await;

    if let Some(query) = &cli.search {
        let highlight_all = session.config().search.highlight_all;
        session.search(query, cli.match_case, highlight_all);
        session.render_window();
    }

    let pages_without_text = session
        .registry()
        .known_pages()
        .filter(|page| session.registry().text(*page).is_some_and(|text| text.trim().is_empty()))
        .map(|page| page.get())
        .collect();
    let rendered_pages = session
        .registry()
        .known_pages()
        .filter(|page| session.registry().is_rendered(*page))
        .map(|page| page.get())
        .collect();
    let report = Report {
        page_count: session.page_count(),
        current_page: session.current_page().get(),
        scale: session.transform().scale(),
        rotation: session.transform().rotation().degrees(),
        rendered_pages,
        pages_without_text,
        link: session.current_deep_link().to_string(),
        matches: session.search_matches(),
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| EngineError::invalid_argument(format!("failed to encode report: {err}")))?;
    println!("{json}");
    Ok(())
}

async fn wait_for_text(session: &mut ViewerSession) {
    let started = Instant::now();
    session.pump(Instant::now());
    while session.has_pending_text() {
        if started.elapsed() > TEXT_WAIT {
            warn!("text extraction still running after {TEXT_WAIT:?}");
            break;
        }
        tokio::time::sleep(PUMP_INTERVAL).await;
        session.pump(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use log::LevelFilter;

    use super::Cli;

    #[test]
    fn cli_parses_search_options() {
        let cli = Cli::try_parse_from([
            "pdf-ink",
            "doc.pdf",
            "--page",
            "4",
            "--search",
            "needle",
            "--match-case",
            "--log-level",
            "debug",
        ])
        .expect("arguments should parse");

        assert_eq!(cli.page, 4);
        assert_eq!(cli.search.as_deref(), Some("needle"));
        assert!(cli.match_case);
        assert_eq!(cli.log_level, LevelFilter::Debug);
    }

    #[test]
    fn cli_requires_a_path() {
        assert!(Cli::try_parse_from(["pdf-ink"]).is_err());
    }
}
