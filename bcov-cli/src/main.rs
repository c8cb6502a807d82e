use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use bcov_filter::{FilterConfig, Filters, IgnoredInsns};
use bcov_ir::MethodBody;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(target_env = "msvc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "bcov", about = "Find compiler-generated cleanup code in JVM bytecode listings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print each method of a listing with node indices
    Disasm {
        /// Path to the listing
        input: PathBuf,
    },
    /// Report the node spans the coverage filters ignore
    Filter {
        /// Path to the listing
        input: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Do not filter try-with-resources cleanup
        #[arg(long)]
        no_try_with_resources: bool,
        /// Do not filter synchronized monitor release
        #[arg(long)]
        no_synchronized: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Yaml,
}

#[derive(Serialize)]
struct MethodReport {
    name: String,
    desc: String,
    ignored: Vec<Span>,
}

#[derive(Serialize)]
struct Span {
    from: u32,
    to: u32,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Disasm { input } => cmd_disasm(&input),
        Commands::Filter {
            input,
            format,
            no_try_with_resources,
            no_synchronized,
        } => {
            let config = FilterConfig {
                try_with_resources: !no_try_with_resources,
                synchronized: !no_synchronized,
            };
            cmd_filter(&input, format, config)
        }
    }
}

fn load(path: &Path) -> Vec<MethodBody> {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}: {e}", path.display());
            std::process::exit(1);
        }
    };
    match bcov_ir::text::parse_methods(&source) {
        Ok(methods) => methods,
        Err(e) => {
            eprintln!("Error: {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

fn cmd_disasm(path: &Path) {
    let methods = load(path);
    println!("# {} ({} methods)", path.display(), methods.len());
    println!();
    for method in &methods {
        print!("{}", bcov_ir::text::disasm(method));
        println!();
    }
}

fn cmd_filter(path: &Path, format: Format, config: FilterConfig) {
    let filters = Filters::new(config);
    let reports: Vec<MethodReport> = load(path)
        .iter()
        .map(|method| {
            let mut ignored = IgnoredInsns::new();
            filters.filter(method, &mut ignored);
            log::info!(
                "{}{}: {} of {} nodes ignored",
                method.name,
                method.desc,
                ignored.len(),
                method.insns.len()
            );
            MethodReport {
                name: method.name.clone(),
                desc: method.desc.clone(),
                ignored: ignored
                    .spans()
                    .into_iter()
                    .map(|(from, to)| Span {
                        from: from.0,
                        to: to.0,
                    })
                    .collect(),
            }
        })
        .collect();

    match format {
        Format::Text => {
            for report in &reports {
                let spans: Vec<String> = report
                    .ignored
                    .iter()
                    .map(|s| format!("{}..={}", s.from, s.to))
                    .collect();
                if spans.is_empty() {
                    println!("{}{}: -", report.name, report.desc);
                } else {
                    println!("{}{}: {}", report.name, report.desc, spans.join(", "));
                }
            }
        }
        Format::Yaml => match serde_yaml::to_string(&reports) {
            Ok(yaml) => print!("{yaml}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
    }
}
