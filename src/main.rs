use clap::{Args, Parser, Subcommand};
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use std::path::PathBuf;
use std::time::Duration;

use element_watch::browser::BrowserSession;
use element_watch::config::{Settings, DEFAULT_INTERVAL};
use element_watch::selectors::{Selector, SelectorType};
use element_watch::server::ElementWatchServer;
use element_watch::tools::{navigation, watch as watch_tools};
use element_watch::watch;

/// element-watch: wait for DOM elements to appear in headless Chrome
#[derive(Parser)]
#[command(name = "element-watch", version, about)]
struct Cli {
    /// Run Chrome with a visible window (default: headless)
    #[arg(long, global = true)]
    headed: bool,

    /// Path to the Chrome/Chromium binary (default: auto-detect)
    #[arg(long, global = true)]
    chrome: Option<PathBuf>,

    /// Default milliseconds between checks
    #[arg(long, global = true, default_value_t = DEFAULT_INTERVAL.as_millis() as u64)]
    interval_ms: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Open a URL and wait for a selector to match
    Watch(WatchArgs),
}

#[derive(Args)]
struct WatchArgs {
    /// Page to open
    #[arg(long)]
    url: String,

    /// Selector to wait for
    #[arg(long)]
    selector: String,

    /// How to interpret the selector: css, text, or xpath
    #[arg(long, default_value = "css")]
    selector_type: SelectorType,

    /// Give up after this many milliseconds (default: wait forever)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JavaScript to evaluate in the page once the element appears
    #[arg(long)]
    on_found_js: Option<String>,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            headless: !self.headed,
            chrome_path: self.chrome.clone(),
            default_interval: Duration::from_millis(self.interval_ms),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr only — stdout is the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();

    match cli.command {
        Some(Command::Watch(args)) => run_watch(settings, args).await,
        Some(Command::Serve) | None => serve(settings).await,
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!("Starting element-watch MCP server (headless: {})", settings.headless);

    let server = ElementWatchServer::new(settings);
    let service = server.clone().serve(stdio()).await?;

    tokio::select! {
        result = service.waiting() => { result?; }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received interrupt signal, shutting down");
        }
    }

    server.shutdown().await;

    tracing::info!("element-watch MCP server shut down");
    Ok(())
}

async fn run_watch(settings: Settings, args: WatchArgs) -> anyhow::Result<()> {
    let session = BrowserSession::launch(&settings).await?;
    let page = session.page();

    let result = async {
        let nav = navigation::navigate(&page, &navigation::NavigateParams { url: args.url.clone() }).await?;

        let started = std::time::Instant::now();
        let selector = Selector::new(&args.selector, args.selector_type);
        let on_found = watch_tools::run_on_found(page.clone(), args.on_found_js.clone());
        let handle = watch::watch_for_element(page.clone(), selector, on_found, settings.default_interval);
        let timeout = args.timeout_ms.map(Duration::from_millis);

        let tick = tokio::select! {
            result = watch::wait_for_watch(&handle, timeout) => result?,
            _ = tokio::signal::ctrl_c() => anyhow::bail!("Interrupted while waiting for {}", handle.selector()),
        };

        // Give an on-found script a moment to run before the browser goes away.
        if args.on_found_js.is_some() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let report = serde_json::json!({
            "url": nav.url,
            "title": nav.title,
            "selector": handle.selector().value,
            "selector_type": handle.selector().kind,
            "tick": tick,
            "elapsed_ms": started.elapsed().as_millis() as u64,
        });
        println!("{}", report);
        anyhow::Ok(())
    }
    .await;

    if let Err(e) = session.close().await {
        tracing::warn!("Error closing browser: {:#}", e);
    }
    result
}
