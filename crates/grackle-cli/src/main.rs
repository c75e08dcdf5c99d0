use anyhow::Context as _;
use clap::Parser;
use grackle::{Generator, GrammarSpec};
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "SLR(1) parser generator", long_about = None)]
struct Args {
    /// The grammar definition file (JSON).
    input: PathBuf,

    /// Write the emitted parser module to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print token/type/rule/state/conflict counts.
    #[arg(long)]
    stats: bool,

    /// Print a detailed record for every counted conflict.
    #[arg(long)]
    conflicts: bool,

    /// Dump the grammar as an s-expression.
    #[arg(long)]
    dump: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let spec = GrammarSpec::from_json(&text)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let generator = Generator::new(&spec).context("failed to compile grammar")?;

    if args.dump {
        println!("{}", generator.grammar().sexp());
    }

    if args.stats {
        let stats = generator.statistics();
        println!("tokens:    {}", stats.tokens);
        println!("types:     {}", stats.types);
        println!("rules:     {}", stats.rules);
        println!("states:    {}", stats.states);
        println!("conflicts: {}", stats.conflicts);
        if args.conflicts {
            for conflict in generator.table().counted_conflicts() {
                println!("- {}", conflict.display(generator.grammar()));
            }
        }
    }

    if let Some(out_file) = &args.output {
        tracing::info!("emit parser to {}", out_file.display());
        fs::write(out_file, generator.codegen().to_string())
            .with_context(|| format!("failed to write {}", out_file.display()))?;
    }

    Ok(())
}
