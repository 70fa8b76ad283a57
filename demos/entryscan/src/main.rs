//! entryscan — rank vehicle entry points onto a secured perimeter.
//!
//! Reads a detection request (perimeter ring, road nodes and ways, optional
//! config) from a JSON file, or runs a built-in demo compound when no file
//! is given, and prints the ranked entry candidates.
//!
//! ```text
//! entryscan                              # built-in demo site
//! entryscan site.json --buffer 50        # wider search annulus
//! entryscan site.json --json > out.json  # full report as JSON
//! entryscan site.json --csv entries.csv  # also write a CSV
//! RUST_LOG=debug entryscan site.json     # pipeline logging
//! ```

mod scenario;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use pa_detect::{DetectionReport, DetectionRequest, DetectionWorker, EntryDetector, write_candidates_csv};

#[derive(Parser)]
#[command(name = "entryscan")]
#[command(about = "Find and rank road entry points onto a secured perimeter")]
struct Cli {
    /// Detection request JSON.  Runs the built-in demo site when omitted.
    request: Option<PathBuf>,

    /// Outer buffer width in metres, overriding the request.
    #[arg(short, long)]
    buffer: Option<f64>,

    /// Print the full report as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Also write the candidates to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Run on the background worker with this deadline, in milliseconds.
    #[arg(long, value_name = "MS")]
    worker: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut request = match &cli.request {
        Some(path) => load_request(path)?,
        None => {
            info!("no request file given; using the built-in demo site");
            scenario::demo_request()
        }
    };
    if let Some(b) = cli.buffer {
        request.config.get_or_insert_with(Default::default).outer_buffer_m = b;
    }

    let detector = EntryDetector::default();
    let report = match cli.worker {
        Some(ms) => {
            let worker = DetectionWorker::spawn(detector);
            let result = worker.submit(&request, Duration::from_millis(ms));
            // Don't wait on a job that missed the deadline.
            worker.detach();
            result?
        }
        None => detector.detect(&request)?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }

    if let Some(path) = &cli.csv {
        write_candidates_csv(path, &report.candidates)
            .with_context(|| format!("writing {}", path.display()))?;
        if !cli.json {
            println!("\nWrote {} rows to {}", report.candidates.len(), path.display());
        }
    }
    Ok(())
}

fn load_request(path: &Path) -> Result<DetectionRequest> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let request = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(request)
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_table(report: &DetectionReport) {
    let s = &report.stats;
    println!(
        "Graph: {} nodes, {} ways, {} edge instances",
        s.node_count, s.way_count, s.edge_instance_count
    );
    println!(
        "Start nodes: {}  |  candidates: {} kept of {}  |  {:.1} ms",
        report.start_node_count,
        report.candidates.len(),
        report.raw_candidate_count,
        report.processing_ms
    );
    if report.candidates.is_empty() {
        println!("\nNo entry candidates found.");
        return;
    }

    println!();
    println!(
        "{:>4}  {:>5}  {:>10}  {:>9}  {:>6}  {:>6}  {:>6}  {:>5}  {:>23}",
        "rank", "conf", "start", "dist_m", "dist", "strt", "cont", "road", "hit (lon, lat)"
    );
    for (i, c) in report.candidates.iter().enumerate() {
        println!(
            "{:>4}  {:>5.3}  {:>10}  {:>9.1}  {:>6.3}  {:>6.3}  {:>6.3}  {:>5.2}  {:>23}",
            i + 1,
            c.confidence,
            c.start_node.get(),
            c.distance_m,
            c.distance_score,
            c.straightness,
            c.continuity,
            c.road_class_score,
            c.intersection_point.to_string(),
        );
    }
}
