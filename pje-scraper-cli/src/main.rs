use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pje_scraper::collector::PageEndPolicy;
use pje_scraper::config::{Credentials, SearchConfig, DEFAULT_COURT_UNIT, DEFAULT_OUTPUT_DIR};
use pje_scraper::driver::WebDriverSession;
use pje_scraper::session::{ExportPlan, Session};

/// Collect judicial process numbers from the PJE portal of the Bahia state
/// court. Credentials come from PJE_USER, PJE_PASSWORD and optionally
/// PJE_PROFILE (also read from a .env file).
#[derive(Parser, Debug)]
#[command(name = "pje-scraper", version, about)]
struct Args {
    /// WebDriver server to connect to
    #[arg(long, default_value = "http://localhost:9515")]
    webdriver_url: String,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Collect the cases under this tag instead of using the search form
    #[arg(long, conflicts_with_all = ["case_class", "party_name", "oab_number", "oab_state"])]
    tag: Option<String>,

    /// Judicial class to search for, e.g. "Execução Fiscal"
    #[arg(long)]
    case_class: Option<String>,

    /// Party name to search for
    #[arg(long)]
    party_name: Option<String>,

    /// Court unit number filled into the search form
    #[arg(long, default_value = DEFAULT_COURT_UNIT)]
    court_unit: String,

    /// OAB registration number (requires --oab-state)
    #[arg(long)]
    oab_number: Option<String>,

    /// OAB state code, e.g. BA (requires --oab-number)
    #[arg(long)]
    oab_state: Option<String>,

    /// How to decide that the last results page was reached
    #[arg(long, value_enum, default_value_t = PageEnd::Total)]
    page_end: PageEnd,

    /// Results per page shown by the portal
    #[arg(long, default_value_t = 20)]
    page_size: usize,

    /// Where to write the JSON export
    #[arg(long, default_value_t = format!("{DEFAULT_OUTPUT_DIR}/processos.json"))]
    json: String,

    /// Also open every case and export party details as CSV to this path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Directory for failure screenshots
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    diagnostics_dir: PathBuf,

    /// Per-wait deadline in seconds
    #[arg(long, default_value_t = 20)]
    timeout: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PageEnd {
    /// Stop on the first page shorter than --page-size
    Count,
    /// Derive the page count from the results label
    Total,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let credentials = Credentials::from_env().context("reading portal credentials")?;
    let search = match args.tag {
        Some(tag) => SearchConfig::for_tag(tag),
        None => SearchConfig::new(
            args.case_class,
            args.party_name,
            Some(args.court_unit),
            args.oab_number,
            args.oab_state,
        )
        .context("building the search filter")?,
    };
    let policy = match args.page_end {
        PageEnd::Count => PageEndPolicy::CountBased {
            page_size: args.page_size,
        },
        PageEnd::Total => PageEndPolicy::TotalDerived {
            page_size: args.page_size,
        },
    };
    let plan = ExportPlan {
        json_path: Some(PathBuf::from(&args.json)),
        with_details: args.csv.is_some(),
        csv_path: args.csv,
    };

    let driver = WebDriverSession::connect(&args.webdriver_url, args.headless)
        .await
        .context("connecting to the WebDriver server")?
        .into_shared();
    let mut session = Session::start(
        driver,
        credentials,
        Duration::from_secs(args.timeout),
        &args.diagnostics_dir,
    )
    .await
    .context("starting the portal session")?;

    let records = session.run(&search, policy, &plan).await?;
    info!(count = records.len(), export = %args.json, "done");
    for record in &records {
        println!("{record}");
    }
    Ok(())
}
