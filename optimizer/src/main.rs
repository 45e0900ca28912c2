use clap::Parser;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitFormat {
    Json,
    Text,
    Dot,
}

#[derive(Parser, Debug)]
#[command(
    name = "weft-opt",
    version,
    about = "Weft optimizer — hoists loop-invariant round-trip transfer pairs in async token-dependency IR"
)]
struct Cli {
    /// Input module (JSON)
    module: PathBuf,

    /// Output file path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    emit: EmitFormat,

    /// Skip input/output verification
    #[arg(long)]
    skip_verify: bool,

    /// Parse and verify only; do not optimize
    #[arg(long)]
    no_opt: bool,

    /// Print pass phases and statistics
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // ── Load module ──
    let source = match std::fs::read_to_string(&cli.module) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("weft-opt: error: {}: {}", cli.module.display(), e);
            std::process::exit(2);
        }
    };

    if cli.verbose {
        let hash = Sha256::digest(source.as_bytes());
        eprintln!("weft-opt: module = {}", cli.module.display());
        eprintln!("weft-opt: source sha256 = {:x}", hash);
    }

    let mut module: weft::ir::Module = match serde_json::from_str(&source) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("weft-opt: parse error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!("weft-opt: {} functions loaded", module.funcs.len());
        for pass in &weft::pass::ALL_PASSES {
            let desc = weft::pass::descriptor(*pass);
            eprintln!("weft-opt: phase {} ({})", desc.name, desc.invariants);
        }
    }

    // ── Verify input ──
    if !cli.skip_verify {
        let diags = weft::verify::verify(&module);
        if !diags.is_empty() {
            for d in &diags {
                eprintln!("weft-opt: {}", d);
            }
            std::process::exit(1);
        }
    }

    // ── Optimize ──
    if !cli.no_opt {
        let stats = weft::pass::run(&mut module);
        if cli.verbose {
            eprintln!(
                "weft-opt: hoisted {} loop(s) in {} sweep(s)",
                stats.rewrites, stats.sweeps
            );
        }

        // The rewrite must leave well-formed IR behind; a post-pass
        // verification failure is a bug in the optimizer, not the input.
        if !cli.skip_verify {
            let diags = weft::verify::verify(&module);
            if !diags.is_empty() {
                for d in &diags {
                    eprintln!("weft-opt: internal error: {}", d);
                }
                std::process::exit(1);
            }
        }
    }

    // ── Emit ──
    let out = match cli.emit {
        EmitFormat::Json => match serde_json::to_string_pretty(&module) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("weft-opt: serialize error: {}", e);
                std::process::exit(2);
            }
        },
        EmitFormat::Text => module.to_string(),
        EmitFormat::Dot => weft::dot::emit_dot(&module),
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, out) {
                eprintln!("weft-opt: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
        }
        None => println!("{}", out),
    }
}
