use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use proxy_listing::{
    fetch_and_load, quick_filters,
    proxy::fetcher::{DEFAULT_FALLBACK_SOURCE, DEFAULT_PRIMARY_SOURCE, DEFAULT_TIMEOUT_SECS},
    save_csv, to_plain_list,
    tui::ProxyBoardApp,
    Config, FetcherConfig, FilterCriteria, IpLookup, LineFormat, RecordStore, RetryPolicy,
    SortKey,
};
use std::path::PathBuf;
use std::time::Duration;

/// Browse, filter and export a proxy IP list
#[derive(Parser)]
#[command(name = "proxy-listing")]
#[command(about = "Browse, filter and export a proxy IP list")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Primary feed source (URL or file path)
    #[arg(long, global = true, default_value = DEFAULT_PRIMARY_SOURCE)]
    source: String,

    /// Fallback feed source, tried after the primary fails
    #[arg(long, global = true, default_value = DEFAULT_FALLBACK_SOURCE)]
    fallback: String,

    /// Disable the fallback source
    #[arg(long, global = true)]
    no_fallback: bool,

    /// Client state file (favorites, history, saved filter, theme)
    #[arg(long, global = true, default_value = proxy_listing::state::DEFAULT_STATE_FILE)]
    state: String,

    /// Line format (auto, comma, hash)
    #[arg(long, global = true, default_value = "auto")]
    format: String,

    /// Timeout in seconds per fetch attempt
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Attempts per source
    #[arg(long, global = true, default_value = "3")]
    retries: u32,
}

/// Filter and sort options shared by listing commands
#[derive(Args, Clone)]
struct FilterArgs {
    /// Substring matched against IP, port, country and company
    #[arg(short, long)]
    search: Option<String>,
    /// Exact country name
    #[arg(short, long)]
    country: Option<String>,
    /// Exact port
    #[arg(short, long)]
    port: Option<String>,
    /// Exact company
    #[arg(short = 'm', long)]
    company: Option<String>,
    /// Sort key (default, ip-asc, ip-desc, port-asc, port-desc, country-asc, country-desc)
    #[arg(long, default_value = "default")]
    sort: String,
    /// Start from the saved filter; explicit flags override its fields
    #[arg(long)]
    saved: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive TUI
    Tui {
        /// Rows per page
        #[arg(long, default_value = "50")]
        page_size: usize,
        /// CSV file written by the export key
        #[arg(short, long, default_value = "proxies.csv")]
        output: PathBuf,
    },
    /// Print one page of the filtered list
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,
        /// Rows per page
        #[arg(long, default_value = "50")]
        page_size: usize,
        /// Show only favorites
        #[arg(long)]
        favorites: bool,
    },
    /// Print the distinct countries, ports and companies
    Facets,
    /// Write the filtered list to a file
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file; plain lists go to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write `ip:port` lines instead of CSV
        #[arg(long)]
        plain: bool,
    },
    /// Manage favorite proxies
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Show or clear the search history
    History {
        /// Clear the history
        #[arg(long)]
        clear: bool,
    },
    /// Save or show the saved filter
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },
    /// Look up the location of an IP address
    Lookup {
        /// IP address
        ip: String,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorite keys
    List,
    /// Add an `ip:port` key
    Add { key: String },
    /// Remove an `ip:port` key
    Remove { key: String },
}

#[derive(Subcommand)]
enum FilterAction {
    /// Save the given filter flags
    Save {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print the saved filter
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("warn"));

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let state_store = config.state_store();

    match cli.command {
        Some(Commands::Tui { page_size, output }) => {
            let config = config
                .with_page_size(page_size)
                .with_export_path(output.to_string_lossy().into_owned());
            run_tui(config).await?;
        }
        None => {
            run_tui(config).await?;
        }
        Some(Commands::List {
            filter,
            page,
            page_size,
            favorites,
        }) => {
            let mut store = load(&config.with_page_size(page_size)).await?;
            let state = state_store.load();
            apply_filter(&mut store, &filter, &state)?;

            if favorites {
                let records = state.favorite_records(store.active());
                if records.is_empty() {
                    println!("No favorites in the current list.");
                }
                for record in records {
                    print_record(&record, true);
                }
                return Ok(());
            }

            store.go_to_page(page);
            let page = store.current_page();
            if page.is_empty() {
                println!("No proxies found.");
                return Ok(());
            }

            for item in &page.items {
                print_record(&item.record, state.is_favorite(&item.record.favorite_key()));
            }
            if let Some((start, end)) = page.range() {
                println!(
                    "\nPage {}/{} ({}-{} of {})",
                    page.page_number, page.total_pages, start, end, page.total_items
                );
            }
        }
        Some(Commands::Facets) => {
            let store = load(&config).await?;
            let facets = store.facets();
            let stats = store.stats();

            println!("Total proxies: {}", stats.total);
            println!("\nCountries ({}):", facets.countries.len());
            for country in &facets.countries {
                println!("  {}", country);
            }
            println!("\nPorts ({}):", facets.ports.len());
            println!("  {}", facets.ports.join(", "));
            println!("\nCompanies ({}):", facets.companies.len());
            for company in &facets.companies {
                println!("  {}", company);
            }

            let quick: Vec<String> = quick_filters(facets).iter().map(|q| q.to_string()).collect();
            if !quick.is_empty() {
                println!("\nQuick filters: {}", quick.join("  "));
            }
        }
        Some(Commands::Export {
            filter,
            output,
            plain,
        }) => {
            let mut store = load(&config).await?;
            apply_filter(&mut store, &filter, &state_store.load())?;
            let records = store.active();

            if records.is_empty() {
                return Err(anyhow!("No proxies match the filter; nothing to export"));
            }

            match (plain, output) {
                (true, None) => println!("{}", to_plain_list(records)),
                (true, Some(path)) => {
                    proxy_listing::proxy::export::save_plain(records, &path)?;
                    println!("Saved {} proxies to {:?}", records.len(), path);
                }
                (false, output) => {
                    let path = output.unwrap_or_else(|| PathBuf::from("proxies.csv"));
                    save_csv(records, &path)?;
                    println!("Exported {} proxies to {:?}", records.len(), path);
                }
            }
        }
        Some(Commands::Favorites { action }) => {
            let mut state = state_store.load();
            match action {
                FavoritesAction::List => {
                    if state.favorites.is_empty() {
                        println!("No favorites.");
                    }
                    for key in &state.favorites {
                        println!("★ {}", key);
                    }
                }
                FavoritesAction::Add { key } => {
                    let key = key.trim().to_string();
                    if !key.contains(':') {
                        return Err(anyhow!("Invalid favorite key: {}. Use ip:port", key));
                    }
                    if state.is_favorite(&key) {
                        println!("Already a favorite: {}", key);
                    } else {
                        state.toggle_favorite(&key);
                        state_store.save(&state)?;
                        println!("Added favorite: {}", key);
                    }
                }
                FavoritesAction::Remove { key } => {
                    if state.remove_favorite(key.trim()) {
                        state_store.save(&state)?;
                        println!("Removed favorite: {}", key);
                    } else {
                        eprintln!("Favorite not found: {}", key);
                    }
                }
            }
        }
        Some(Commands::History { clear }) => {
            let mut state = state_store.load();
            if clear {
                state.clear_history();
                state_store.save(&state)?;
                println!("Search history cleared.");
            } else if state.search_history.is_empty() {
                println!("No search history.");
            } else {
                for (i, term) in state.search_history.iter().enumerate() {
                    println!("{:2}. {}", i + 1, term);
                }
            }
        }
        Some(Commands::Filter { action }) => {
            let mut state = state_store.load();
            match action {
                FilterAction::Save { filter } => {
                    let (criteria, sort) = criteria_from_args(&filter, None)?;
                    state.save_filter(criteria, sort);
                    state_store.save(&state)?;
                    println!("Filter saved to {:?}", state_store.path());
                }
                FilterAction::Show => match &state.saved_filter {
                    Some(saved) => {
                        let show = |v: Option<&str>| v.unwrap_or("-").to_string();
                        println!("Search:  {}", show(saved.criteria.search_term().as_deref()));
                        println!("Country: {}", show(saved.criteria.country_value()));
                        println!("Port:    {}", show(saved.criteria.port_value()));
                        println!("Company: {}", show(saved.criteria.company_value()));
                        println!("Sort:    {}", saved.sort);
                    }
                    None => println!("No saved filter."),
                },
            }
        }
        Some(Commands::Lookup { ip }) => {
            let lookup = IpLookup::new()?;
            let location = lookup.lookup(&ip).await?;

            println!("IP:       {}", location.ip);
            println!("Location: {}", location);
            if let Some(code) = &location.country_code {
                println!("Country:  {}", code);
            }
            if let Some(isp) = &location.isp {
                println!("ISP:      {}", isp);
            }
            if let Some(org) = &location.org {
                println!("Org:      {}", org);
            }
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<Config> {
    let fallback = (!cli.no_fallback && !cli.fallback.trim().is_empty())
        .then(|| cli.fallback.clone());

    let fetcher = FetcherConfig::new()
        .with_primary(cli.source.clone())
        .with_fallback(fallback)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_retry(RetryPolicy::default().with_max_attempts(cli.retries));

    Ok(Config::new()
        .with_fetcher(fetcher)
        .with_line_format(parse_line_format(&cli.format)?)
        .with_state_path(cli.state.clone()))
}

async fn load(config: &Config) -> Result<RecordStore> {
    let (store, report, outcome) = fetch_and_load(config)
        .await
        .context("Failed to load proxy list")?;

    log::info!(
        "Loaded {} proxies from {} ({} lines rejected, {} attempts)",
        report.records.len(),
        outcome.source,
        report.failures,
        outcome.attempts
    );
    Ok(store)
}

async fn run_tui(config: Config) -> Result<()> {
    println!("Loading proxy list...");
    let store = load(&config).await?;

    let export_path = PathBuf::from(&config.export_path);
    let mut app = ProxyBoardApp::new(store, config.state_store(), export_path)
        .with_fetcher(config.fetcher.clone());
    app.run().await?;

    if let Some(copied) = app.last_copied() {
        println!("{}", copied);
    }
    Ok(())
}

fn criteria_from_args(
    args: &FilterArgs,
    base: Option<(FilterCriteria, SortKey)>,
) -> Result<(FilterCriteria, SortKey)> {
    let (mut criteria, base_sort) = base.unwrap_or_default();

    if let Some(search) = &args.search {
        criteria.search_text = Some(search.clone());
    }
    if let Some(country) = &args.country {
        criteria.country = Some(country.clone());
    }
    if let Some(port) = &args.port {
        criteria.port = Some(port.clone());
    }
    if let Some(company) = &args.company {
        criteria.company = Some(company.clone());
    }

    let sort = parse_sort_key(&args.sort)?;
    let sort = if sort == SortKey::Default { base_sort } else { sort };
    Ok((criteria, sort))
}

fn apply_filter(
    store: &mut RecordStore,
    args: &FilterArgs,
    state: &proxy_listing::state::ClientState,
) -> Result<()> {
    let base = if args.saved {
        let saved = state
            .saved_filter
            .clone()
            .ok_or_else(|| anyhow!("No saved filter; run `filter save` first"))?;
        Some((saved.criteria, saved.sort))
    } else {
        None
    };

    let (criteria, sort) = criteria_from_args(args, base)?;
    store.apply(criteria, sort);
    Ok(())
}

fn print_record(record: &proxy_listing::ProxyRecord, favorite: bool) {
    let mark = if favorite { "★" } else { " " };
    println!(
        "{} {:<40} {:<6} {:<12} {}",
        mark,
        record.ip,
        record.port,
        record.country_label(),
        record.company
    );
}

fn parse_sort_key(s: &str) -> Result<SortKey> {
    s.parse::<SortKey>().map_err(|e| anyhow!(e))
}

fn parse_line_format(s: &str) -> Result<LineFormat> {
    s.parse::<LineFormat>().map_err(|e| anyhow!(e))
}
