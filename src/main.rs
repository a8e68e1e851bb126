use clap::{Parser as ClapParser, Subcommand};
use rql_lang::QueryOptions;
use rql_lang::cli::{self, CheckOptions, CheckResult, CliError};
use std::io::{self, Read};
use tracing::Level;

#[derive(ClapParser)]
#[command(name = "rql")]
#[command(about = "RQL - A URI-embeddable query language for filtering, sorting, and aggregating records")]
#[command(version)]
struct Cli {
    /// Log pipeline compilation and execution to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and execute an RQL query against a JSON array of objects
    Check {
        /// The RQL query to execute
        query: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't execute
        #[arg(long)]
        syntax_only: bool,

        /// Truncate results of queries without limit() to this length
        #[arg(long)]
        default_limit: Option<usize>,

        /// Cap every limit() count to this value
        #[arg(long)]
        max_limit: Option<usize>,

        /// Drop top-level eq() clauses on these fields
        #[arg(long, value_delimiter = ',')]
        ignore_top_eq: Vec<String>,
    },

    /// Print the call-tree of a query as JSON
    Parse {
        /// The RQL query to parse
        query: String,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Print a query in canonical call form
    Normalize {
        /// The RQL query to normalize
        query: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check {
            query,
            input,
            pretty,
            syntax_only,
            default_limit,
            max_limit,
            ignore_top_eq,
        } => {
            let mut engine = QueryOptions::new().ignore_top_eq(ignore_top_eq);
            engine.default_limit = default_limit;
            engine.max_limit = max_limit;
            run_check(query, input, pretty, syntax_only, engine)
        }
        Commands::Parse { query, pretty } => {
            cli::execute_parse(&query).and_then(|tree| print_json(&tree, pretty))
        }
        Commands::Normalize { query } => cli::execute_normalize(&query).map(|text| {
            println!("{}", text);
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(
    query: String,
    input: Option<String>,
    pretty: bool,
    syntax_only: bool,
    engine: QueryOptions,
) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = CheckOptions {
        query,
        input,
        syntax_only,
        engine,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(output) => print_json(&output, pretty)?,
    }
    Ok(())
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }?;
    println!("{}", json);
    Ok(())
}
