use std::io::{self, Write};
use std::process;

use clap::Parser;
use env_logger::Env;

use coregraph::error::CoreGraphError;
use coregraph::gfa::{read_gfa, write_gfa};
use coregraph::{merge_graphs, MergeOptions};

#[derive(Parser)]
#[command(
    name = "coregraph",
    version,
    about = "Merge two variation graphs into a core graph on shared paths and unique k-mers"
)]
struct Args {
    /// First input graph (GFA)
    graph1: String,

    /// Second input graph (GFA)
    graph2: String,

    /// Also merge on k-mers of this size
    #[arg(short = 'k', long = "kmer-size")]
    kmer_size: Option<usize>,

    /// Bound the k-mer enumerator at this many choice points per walk
    #[arg(short = 'e', long = "edge-max")]
    edge_max: Option<usize>,

    /// Skip path merging; requires --kmer-size
    #[arg(short = 'o', long = "kmers-only")]
    kmers_only: bool,

    /// Worker threads for k-mer observation
    #[arg(short = 't', long, default_value = "1")]
    threads: usize,

    /// Verbose progress on standard error
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    // help and usage problems both leave with status 1
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    if let Err(err) = run(args) {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.kmers_only && args.kmer_size.is_none() {
        return Err(Box::new(CoreGraphError::Usage(
            "--kmers-only requires --kmer-size".to_string(),
        )));
    }

    // only initialize the pool if nothing else has yet
    let _ = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global();

    let graph_a = read_gfa(&args.graph1)?;
    let graph_b = read_gfa(&args.graph2)?;

    let options = MergeOptions {
        kmer_size: args.kmer_size,
        edge_max: args.edge_max.unwrap_or(usize::MAX),
        kmers_only: args.kmers_only,
    };
    let merged = merge_graphs(&graph_a, &graph_b, &options)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_gfa(&merged, &mut out)?;
    out.flush()?;
    Ok(())
}
