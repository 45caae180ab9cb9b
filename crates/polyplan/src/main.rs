use clap::Parser;
use tracing_subscriber::EnvFilter;

/// `--schema` prints the catalog source schema (before clap parsing).
fn handle_schema_flag() -> bool {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) != Some("--schema") {
        return false;
    }
    match polyplan_output::schema_json::<polyplan_catalog::CatalogSource>() {
        Ok(schema) => println!("{}", schema),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
    true
}

/// Reset SIGPIPE to default behavior so piping to `head` etc. doesn't panic.
#[cfg(unix)]
fn reset_sigpipe() {
    // SAFETY: libc::signal only changes the signal disposition back to the
    // POSIX default (terminate on broken pipe).
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn reset_sigpipe() {}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("POLYPLAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    reset_sigpipe();

    if handle_schema_flag() {
        return;
    }

    init_tracing();

    let cli = polyplan::Cli::parse();
    match polyplan::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
