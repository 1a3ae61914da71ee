use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use handle_avail::check::{Backend, Client, StaticDataset};
use handle_avail::config::{self, Config, EmptyResults, Overrides};
use handle_avail::controller::SearchController;
use handle_avail::fragment::DEFAULT_PAGE;
use handle_avail::render::DisplayState;
use handle_avail::terminal;

#[derive(Parser)]
#[command(
    name = "handle-avail",
    version,
    about = "Check whether a username is available across platforms",
    after_help = "The page URL carries state: its `port` query parameter selects the \
                  backend port and its fragment holds the percent-encoded username, \
                  so a printed page URL restores the same search.\n\n\
                  Exit status: 0 when the search completed, 1 when it failed, \
                  2 on usage or configuration errors."
)]
struct Cli {
    /// Username to check; defaults to the page fragment
    query: Option<String>,

    /// Page URL supplying `?port=` and `#<username>`
    #[arg(long, default_value = DEFAULT_PAGE)]
    page: String,

    /// Backend port (overrides the page's `port` parameter)
    #[arg(long)]
    port: Option<String>,

    /// Backend host
    #[arg(long)]
    host: Option<String>,

    /// Answer every query from a JSON result list (file path or http(s) URL)
    /// instead of the backend
    #[arg(long, value_name = "FILE|URL")]
    dataset: Option<String>,

    /// Quiet interval before typing triggers a search
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Per-request timeout
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Print nothing (instead of "No results found") for empty result sets
    #[arg(long)]
    blank_empty: bool,

    /// Search as you type in the terminal
    #[arg(short, long)]
    interactive: bool,

    /// Suppress output, exit code only
    #[arg(short, long)]
    quiet: bool,

    /// Print the resulting page URL after the results
    #[arg(long)]
    print_url: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port.clone(),
            host: self.host.clone(),
            debounce: self.delay_ms.map(Duration::from_millis),
            timeout: self.timeout_secs.map(Duration::from_secs),
            empty_results: self.blank_empty.then_some(EmptyResults::Blank),
        }
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .init(),
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

#[cfg(unix)]
fn reset_sigpipe() {
    // Die quietly when piped into `head` instead of panicking on EPIPE.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn reset_sigpipe() {}

fn main() -> ExitCode {
    reset_sigpipe();
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_file.as_ref()) {
        eprintln!("error: opening log file: {e}");
        return ExitCode::from(2);
    }

    let page = match config::parse_page(&cli.page) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    let config = match Config::from_page(&page, &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let client = Client::new(&config);
    let backend: Arc<dyn Backend> = match &cli.dataset {
        Some(location) => match StaticDataset::open(location, &client) {
            Ok(dataset) => Arc::new(dataset),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(2);
            }
        },
        None => Arc::new(client),
    };

    let mut controller = SearchController::new(backend, page, &config);

    if cli.interactive {
        if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
            eprintln!("error: --interactive needs a terminal");
            return ExitCode::from(2);
        }
        if let Some(query) = &cli.query {
            controller.on_input(query, std::time::Instant::now());
            controller.submit();
        } else {
            controller.on_load();
        }
        if let Err(e) = terminal::run(&mut controller) {
            eprintln!("error: terminal: {e}");
            return ExitCode::from(2);
        }
        println!("{}", controller.page());
        return ExitCode::SUCCESS;
    }

    match &cli.query {
        Some(query) => {
            controller.on_input(query, std::time::Instant::now());
            controller.submit();
        }
        None => {
            controller.on_load();
            if let Some(notice) = controller.notice() {
                eprintln!("warning: {notice}");
            }
        }
    }
    controller.run_until_idle();

    let display = controller.display();
    if !cli.quiet {
        print!("{display}");
        if cli.print_url {
            println!("{}", controller.page());
        }
    }

    if matches!(display, DisplayState::Failed { .. }) {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
