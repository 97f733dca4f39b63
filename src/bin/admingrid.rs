//! admingrid: list, filter and search admin datagrids from the shell.
//!
//! # Usage
//!
//! ```bash
//! # First page of an admin
//! admingrid list admin.user
//!
//! # Filter, sort and page
//! admingrid list admin.user -w 'name~ann' -w 'age>=30' --sort name --order desc --page 2
//!
//! # Search every global_search filter
//! admingrid search admin.user gibson
//!
//! # Show the generated query
//! admingrid explain admin.user -w '|name^a' -w '|name^b'
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use admingrid::config::AdminConfig;
use admingrid::parser::FilterExpression;
use admingrid::prelude::*;

#[derive(Parser)]
#[command(name = "admingrid")]
#[command(version)]
#[command(about = "Admin list screens: filters, pagination and search", long_about = None)]
#[command(after_help = "EXAMPLES:
    admingrid list admin.user -w 'name~ann' --page 2
    admingrid search admin.book gibson --per-page 10
    admingrid explain admin.user -w 'age>=30' --sort name")]
struct Cli {
    /// Configuration file (defaults to $ADMINGRID_CONFIG or ./admingrid.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL, overrides [database].url
    #[arg(long, env = "ADMINGRID_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Args)]
struct GridArgs {
    /// Admin code
    admin: String,

    /// Filter expressions (name~foo, age>=30, |name^a for OR)
    #[arg(short = 'w', long = "where")]
    filters: Vec<String>,

    #[arg(long)]
    page: Option<usize>,

    #[arg(long)]
    per_page: Option<usize>,

    /// Field to sort by
    #[arg(long)]
    sort: Option<String>,

    /// Sort order (asc or desc)
    #[arg(long)]
    order: Option<SortOrder>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one page of an admin's datagrid
    List {
        #[command(flatten)]
        grid: GridArgs,

        /// Forget persisted filters first
        #[arg(long)]
        reset: bool,

        /// Neither read nor store persisted filters
        #[arg(long)]
        no_persist: bool,
    },
    /// Search every global_search filter of an admin
    Search {
        admin: String,

        term: String,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        per_page: Option<usize>,
    },
    /// Show the query a datagrid would run
    Explain {
        #[command(flatten)]
        grid: GridArgs,
    },
    /// List configured admins and their filters
    Admins,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("ADMINGRID_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = GridConfig::load(cli.config.as_deref()).context("loading configuration")?;

    if let Commands::Admins = cli.command {
        show_admins(&config);
        return Ok(());
    }

    let url = cli.database_url.clone().or_else(|| config.database.url.clone());
    match url {
        Some(url) => {
            let backend = SqlBackend::connect(&url).with_context(|| format!("connecting to {}", url))?;
            dispatch(cli, &config, backend)
        }
        None => dispatch(cli, &config, load_fixtures(&config)?),
    }
}

fn load_fixtures(config: &GridConfig) -> Result<MemoryBackend> {
    let backend = MemoryBackend::new();
    for admin in &config.admins {
        let Some(fixture) = &admin.fixture else {
            continue;
        };
        let path = config.resolve(fixture);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let documents = match serde_json::from_str(&content)? {
            serde_json::Value::Array(documents) => documents,
            _ => anyhow::bail!("fixture {} must hold a JSON array", path.display()),
        };
        let loaded = backend.insert_many(&admin.table, documents);
        tracing::info!("Loaded {} document(s) into '{}'", loaded, admin.table);
    }
    Ok(backend)
}

fn dispatch<B: Backend>(cli: &Cli, config: &GridConfig, backend: B) -> Result<()> {
    match &cli.command {
        Commands::List { grid, reset, no_persist } => {
            let mut admin = build_admin(config, &grid.admin, backend)?;
            let persister = (config.grid.persist_filters && !no_persist)
                .then(|| SessionFilterPersister::new(FileSession::new(config.session_file())));

            let (request, expressions) = request_values(grid)?;
            let values = admin.filter_parameters(
                request,
                *reset,
                persister.as_ref().map(|p| p as &dyn FilterPersister),
            )?;
            let datagrid = admin.build_datagrid(values)?;
            apply_conditions(datagrid, &expressions)?;

            let pager = datagrid.pager()?;
            print_page_header(pager);
            let rows = pager.results(Hydration::Object)?.to_vec();
            format_output(&rows, cli.format);
            print_active_filters(datagrid);
        }
        Commands::Search { admin, term, page, per_page } => {
            let mut admin = build_admin(config, admin, backend)?;
            let per_page = config.grid.per_page(*per_page);
            let handler = SearchHandler::new(config.grid.search_case_sensitive);
            match handler.search(&mut admin, term, *page, per_page)? {
                Some(pager) => {
                    print_page_header(pager);
                    let rows = pager.results(Hydration::Object)?.to_vec();
                    format_output(&rows, cli.format);
                }
                None => println!(
                    "{}",
                    format!("Admin '{}' has no searchable filters", admin.code()).yellow()
                ),
            }
        }
        Commands::Explain { grid } => {
            let mut admin = build_admin(config, &grid.admin, backend)?;
            let (values, expressions) = request_values(grid)?;
            let datagrid = admin.build_datagrid(values)?;
            apply_conditions(datagrid, &expressions)?;
            let query = datagrid.query()?;
            explain(&query);
        }
        Commands::Admins => show_admins(config),
    }
    Ok(())
}

fn build_admin<B: Backend>(
    config: &GridConfig,
    code: &str,
    backend: B,
) -> Result<Admin<ModelStore<B>>> {
    let admin_config: &AdminConfig = config.admin(code)?;
    let models = ModelStore::new(backend).with_model(admin_config.model());
    let admin = Admin::new(
        admin_config.definition.clone(),
        models,
        &FilterFactory::new(),
        &TypeGuesserChain::default(),
    )
    .with_context(|| format!("setting up admin '{}'", code))?;
    Ok(admin.with_settings(config.grid.clone()))
}

fn request_values(grid: &GridArgs) -> Result<(DatagridValues, Vec<FilterExpression>)> {
    let expressions = admingrid::parser::parse_all(&grid.filters)?;
    let mut values = DatagridValues {
        page: grid.page,
        per_page: grid.per_page,
        sort_by: grid.sort.clone(),
        sort_order: grid.order,
        ..Default::default()
    };
    for expr in &expressions {
        values.set(expr.name.clone(), expr.data.clone());
    }
    Ok((values, expressions))
}

/// `|` expressions move their filter into the OR group.
fn apply_conditions<B: Backend>(datagrid: &mut Datagrid<B>, expressions: &[FilterExpression]) -> Result<()> {
    for expr in expressions {
        let filter = datagrid
            .filter_mut(&expr.name)
            .ok_or_else(|| anyhow::anyhow!("admin has no filter named '{}'", expr.name))?;
        filter.set_condition(expr.condition);
    }
    Ok(())
}

fn print_page_header<B: Backend>(pager: &Pager<B>) {
    if pager.last_page() == 0 {
        println!("{} {}", "Results:".green().bold(), pager.nb_results());
        return;
    }
    let links: Vec<String> = pager
        .links(0)
        .into_iter()
        .map(|p| {
            if p == pager.page() {
                format!("[{}]", p).cyan().bold().to_string()
            } else {
                p.to_string()
            }
        })
        .collect();
    println!(
        "{} {}/{}  {} {}-{} of {}  {}",
        "Page".green().bold(),
        pager.page(),
        pager.last_page(),
        "rows".dimmed(),
        pager.first_indice(),
        pager.last_indice(),
        pager.nb_results(),
        links.join(" ")
    );
}

fn print_active_filters<B: Backend>(datagrid: &Datagrid<B>) {
    if !datagrid.has_active_filters() {
        return;
    }
    let active: Vec<String> = datagrid
        .filters()
        .filter(|f| f.is_active())
        .map(|f| f.label().to_string())
        .collect();
    println!("{} {}", "Filtered by:".dimmed(), active.join(", ").yellow());
}

fn format_output(results: &[serde_json::Value], format: OutputFormat) {
    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results).unwrap_or_default());
        }
        OutputFormat::Table => {
            // Column names from the first row
            let columns: Vec<String> = results[0]
                .as_object()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default();

            let widths: Vec<usize> = columns
                .iter()
                .map(|c| {
                    results
                        .iter()
                        .map(|row| val_to_string(&row[c.as_str()]).chars().count())
                        .fold(c.chars().count(), usize::max)
                })
                .collect();

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = *w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in results {
                let cells: Vec<String> = columns
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| format!("{:width$}", val_to_string(&row[c.as_str()]), width = *w))
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", results.len().to_string().cyan());
        }
    }
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn explain<B: Backend>(query: &ProxyQuery<B>) {
    let cmd = query.final_cmd();
    println!("{}", "Query Structure:".green().bold());
    println!("  {} {}", "Table:".dimmed(), cmd.table.white());

    if !cmd.cages.is_empty() {
        println!("  {}", "Cages:".dimmed());
        for cage in &cmd.cages {
            let kind = match &cage.kind {
                CageKind::Filter if cage.is_or_group() => "Filter (OR)".to_string(),
                CageKind::Filter => "Filter".to_string(),
                CageKind::Sort(SortOrder::Asc) => "Sort ↑".to_string(),
                CageKind::Sort(SortOrder::Desc) => "Sort ↓".to_string(),
                CageKind::Limit(n) => format!("Limit({})", n),
                CageKind::Offset(n) => format!("Offset({})", n),
            };
            println!("    [{}]", kind.cyan());
            for cond in &cage.conditions {
                println!(
                    "      {} {:?} {}",
                    cond.column.white(),
                    cond.op,
                    cond.value.to_string().yellow()
                );
            }
        }
    }

    if !query.parameters().is_empty() {
        println!("  {}", "Bindings:".dimmed());
        for (i, value) in query.parameters().iter().enumerate() {
            println!("    ${} = {}", i + 1, value.to_string().yellow());
        }
    }

    println!();
    println!("{}", "Generated SQL:".green().bold());
    let sql = query.sql().unwrap_or_else(|| cmd.to_sql());
    println!("  {}", sql.white());
}

fn show_admins(config: &GridConfig) {
    if config.admins.is_empty() {
        println!("{}", "No admins configured.".yellow());
        return;
    }
    for admin in &config.admins {
        let def = &admin.definition;
        println!(
            "{} {} {}",
            def.code.cyan().bold(),
            def.class.white(),
            format!("({})", admin.table).dimmed()
        );
        for filter in &def.filters {
            let kind = filter
                .filter_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "guessed".to_string());
            let search = if filter.options.global_search { " search" } else { "" };
            println!(
                "    {} {} {}{}",
                filter.name.white(),
                kind.yellow(),
                filter.field_name().dimmed(),
                search.green()
            );
        }
    }
}
