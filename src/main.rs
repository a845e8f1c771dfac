use clap::{Parser, Subcommand};
use hintsolver::{
    build_category_index, format_category_list, format_compact, normalize_category,
    solve, solve_batch, AllowedCategorySet, CategoryRegistry, FilterStore, LoadMode, MatchMode,
    QueryOptions, ScanConfig, SolverError, DEFAULT_LIMIT, DEFAULT_MAX_STATEMENT_LEN,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "hintsolver")]
#[command(about = "Streaming hint solver over word/hint dumps")]
#[command(version)]
struct Cli {
    /// Dataset file to scan
    #[arg(short, long, env = "WORDS_FILE", global = true, default_value = "words.js")]
    words_file: PathBuf,

    /// Memory-map the dataset instead of buffered reads
    #[arg(long, global = true)]
    mmap: bool,

    /// Bytes buffered without a terminator before a forced flush
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_STATEMENT_LEN)]
    max_statement_len: usize,

    /// Stop each query scan after this many statements
    #[arg(long, global = true)]
    max_statements: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the category index and show statistics
    Index {
        /// Print categories as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find words whose hint matches
    Solve {
        /// Hint to look for
        hint: String,

        /// Match mode: exact, contains, startswith, endswith
        #[arg(short, long, default_value = "exact")]
        mode: MatchMode,

        /// Maximum matched words
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Restrict to these categories (name or id, repeatable)
        #[arg(short, long)]
        category: Vec<String>,

        /// Print the grouped result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search categories by name or id
    Findcat {
        /// Search term
        query: String,
    },

    /// Solve several hints in parallel
    Batch {
        /// Hints to look for
        #[arg(required = true)]
        hints: Vec<String>,

        /// Match mode: exact, contains, startswith, endswith
        #[arg(short, long, default_value = "exact")]
        mode: MatchMode,

        /// Maximum matched words per hint
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Restrict to these categories (name or id, repeatable)
        #[arg(short, long)]
        category: Vec<String>,
    },

    /// Interactive session reading commands from stdin
    Shell {
        /// Initial match mode
        #[arg(short, long, default_value = "exact")]
        mode: MatchMode,

        /// Maximum matched words per hint
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ScanConfig {
        max_statement_len: cli.max_statement_len,
        load_mode: if cli.mmap {
            LoadMode::Mmap
        } else {
            LoadMode::Buffered
        },
        max_statements: cli.max_statements,
    };
    let path = cli.words_file;

    let result = match cli.command {
        Commands::Index { json } => cmd_index(&path, &config, json),

        Commands::Solve {
            hint,
            mode,
            limit,
            category,
            json,
        } => cmd_solve(&path, &config, hint, mode, limit, category, json),

        Commands::Findcat { query } => cmd_findcat(&path, &config, query),

        Commands::Batch {
            hints,
            mode,
            limit,
            category,
        } => cmd_batch(&path, &config, hints, mode, limit, category),

        Commands::Shell { mode, limit } => cmd_shell(&path, &config, mode, limit),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Resolve category names into an allow-set. Unknown names are reported and
/// skipped; it is an error only when none resolve.
fn resolve_allowed(
    path: &Path,
    config: &ScanConfig,
    categories: &[String],
) -> hintsolver::Result<Option<AllowedCategorySet>> {
    if categories.is_empty() {
        return Ok(None);
    }

    let registry = build_category_index(path, config)?;
    let mut allowed = AllowedCategorySet::default();

    for raw in categories {
        match registry.resolve_alias(raw) {
            Some(category) => {
                allowed.insert(normalize_category(&category.id));
            }
            None => eprintln!("Ignoring unknown category: {raw}"),
        }
    }

    if allowed.is_empty() {
        return Err(SolverError::UnknownCategory(categories.join(", ")));
    }

    Ok(Some(allowed))
}

fn cmd_index(path: &Path, config: &ScanConfig, json: bool) -> hintsolver::Result<()> {
    let start = Instant::now();
    let registry = build_category_index(path, config)?;
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(registry.categories())?);
        return Ok(());
    }

    println!("Category Index");
    println!("==============");
    println!("Source:      {}", path.display());
    println!("Categories:  {}", registry.category_count());
    println!("Aliases:     {}", registry.alias_count());
    println!("Built in:    {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

fn cmd_solve(
    path: &Path,
    config: &ScanConfig,
    hint: String,
    mode: MatchMode,
    limit: usize,
    categories: Vec<String>,
    json: bool,
) -> hintsolver::Result<()> {
    let allowed = resolve_allowed(path, config, &categories)?;
    let options = QueryOptions {
        mode,
        limit,
        allowed: allowed.as_ref(),
    };

    let result = solve(path, &hint, &options, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_compact(&result.matches));
    }

    Ok(())
}

fn cmd_findcat(path: &Path, config: &ScanConfig, query: String) -> hintsolver::Result<()> {
    if normalize_category(&query).is_empty() {
        println!("Usage: findcat <search term>  (ex: findcat food)");
        return Ok(());
    }

    let registry = build_category_index(path, config)?;
    println!("{}", format_category_list(&registry.search(&query)));

    Ok(())
}

fn cmd_batch(
    path: &Path,
    config: &ScanConfig,
    hints: Vec<String>,
    mode: MatchMode,
    limit: usize,
    categories: Vec<String>,
) -> hintsolver::Result<()> {
    let allowed = resolve_allowed(path, config, &categories)?;
    let options = QueryOptions {
        mode,
        limit,
        allowed: allowed.as_ref(),
    };

    let start = Instant::now();
    let results = solve_batch(path, &hints, &options, config);

    for (hint, result) in hints.iter().zip(results) {
        println!("== {hint}");
        match result {
            Ok(result) => println!("{}", format_compact(&result.matches)),
            Err(e) => println!("Error: {e}"),
        }
        println!();
    }

    println!(
        "Solved {} hints in {:.3}ms",
        hints.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}

const SHELL_SESSION: &str = "local";

fn cmd_shell(
    path: &Path,
    config: &ScanConfig,
    mut mode: MatchMode,
    limit: usize,
) -> hintsolver::Result<()> {
    let registry = build_category_index(path, config)?;
    let filters: FilterStore<String> = FilterStore::new();

    println!(
        "{} categories loaded. Commands: categories <names|clear|show>, findcat <term>, mode <mode>, quit",
        registry.category_count()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        let input = input.strip_prefix('.').unwrap_or(input);

        if input.is_empty() {
            continue;
        }

        let (command, rest) = input
            .split_once(char::is_whitespace)
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((input, ""));

        let reply = match command.to_ascii_lowercase().as_str() {
            "quit" | "exit" => break,
            "categories" => filters
                .apply(SHELL_SESSION.to_string(), &registry, rest)
                .to_string(),
            "findcat" => shell_findcat(&registry, rest),
            "mode" => match rest.parse::<MatchMode>() {
                Ok(m) => {
                    mode = m;
                    format!("Mode set to {mode}.")
                }
                Err(e) => e.to_string(),
            },
            _ => {
                let allowed = filters.get(&SHELL_SESSION.to_string());
                let options = QueryOptions {
                    mode,
                    limit,
                    allowed: allowed.as_deref(),
                };
                match solve(path, input, &options, config) {
                    Ok(result) => format_compact(&result.matches),
                    Err(e) => format!("Error: {e}"),
                }
            }
        };

        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }

    Ok(())
}

fn shell_findcat(registry: &CategoryRegistry, query: &str) -> String {
    if normalize_category(query).is_empty() {
        return "Usage: findcat <search term>  (ex: findcat food)".to_string();
    }
    format_category_list(&registry.search(query))
}
