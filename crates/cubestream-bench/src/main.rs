use std::path::PathBuf;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use cubestream_bench::report;
use cubestream_bench::runner::{BenchmarkResult, BenchmarkRunner};
use cubestream_bench::scenes;

const USAGE: &str = "\
Usage: stream-bench [OPTIONS]
  --baseline <path>              Compare against a saved JSON baseline
  --output <path>                Write this run as a JSON baseline
  --regression-threshold <pct>   Allowed mean slowdown in percent (default: 10)
  --ticks <n>                    Ticks per scene (default: 600)
  --scene <name>                 Run only the named scene";

struct Options {
    baseline: Option<PathBuf>,
    output: Option<PathBuf>,
    threshold_pct: f64,
    ticks: u32,
    scene: Option<String>,
}

enum Parsed {
    Run(Options),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Parsed, String> {
    let mut opts = Options {
        baseline: None,
        output: None,
        threshold_pct: 10.0,
        ticks: 600,
        scene: None,
    };
    while let Some(flag) = args.next() {
        let mut value = || args.next().ok_or_else(|| format!("{flag} needs a value"));
        match flag.as_str() {
            "--baseline" => opts.baseline = Some(value()?.into()),
            "--output" => opts.output = Some(value()?.into()),
            "--regression-threshold" => {
                opts.threshold_pct = value()?
                    .parse()
                    .map_err(|_| "invalid --regression-threshold value".to_string())?;
            }
            "--ticks" => {
                opts.ticks = value()?
                    .parse()
                    .map_err(|_| "invalid --ticks value".to_string())?;
            }
            "--scene" => opts.scene = Some(value()?),
            "--help" | "-h" => return Ok(Parsed::Help),
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Parsed::Run(opts))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(Parsed::Run(opts)) => opts,
        Ok(Parsed::Help) => {
            eprintln!("{USAGE}");
            return;
        }
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            process::exit(2);
        }
    };

    let selected: Vec<_> = scenes::standard_scenes()
        .into_iter()
        .filter(|s| opts.scene.as_deref().map_or(true, |name| s.name == name))
        .collect();
    if selected.is_empty() {
        eprintln!("no scene named {:?}", opts.scene.unwrap_or_default());
        process::exit(2);
    }

    let runner = BenchmarkRunner::new(opts.ticks);
    let results: Vec<BenchmarkResult> = selected
        .iter()
        .map(|scene| runner.run_scene(scene))
        .collect::<Result<_, _>>()
        .unwrap_or_else(|e| {
            log::error!("World setup failed: {e}");
            process::exit(1);
        });

    println!("\n## Streaming Benchmark Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(path) = &opts.output {
        let baseline = report::Baseline {
            timestamp: timestamp(),
            results: results.clone(),
        };
        match report::save_baseline(path, &baseline) {
            Ok(()) => log::info!("Wrote baseline {}", path.display()),
            Err(e) => {
                log::error!("Could not write baseline {}: {e}", path.display());
                process::exit(1);
            }
        }
    }

    if let Some(path) = &opts.baseline {
        let Some(baseline) = report::load_baseline(path) else {
            log::warn!("No baseline at {}, skipping comparison", path.display());
            return;
        };
        let regressions = report::compare(&results, &baseline, opts.threshold_pct);
        println!("{}", report::format_comparison(&regressions, opts.threshold_pct));
        if !regressions.is_empty() {
            eprintln!("{} scene(s) regressed", regressions.len());
            process::exit(1);
        }
    }

    log::info!("Benchmark complete.");
}

/// Seconds since the epoch; enough to tell baselines apart.
fn timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("unix-{secs}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Parsed, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_defaults_and_flags() {
        let Ok(Parsed::Run(opts)) = parse(&["--ticks", "50", "--scene", "fill-L6"]) else {
            panic!("expected run options");
        };
        assert_eq!(opts.ticks, 50);
        assert_eq!(opts.scene.as_deref(), Some("fill-L6"));
        assert_eq!(opts.threshold_pct, 10.0);
        assert!(opts.baseline.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse(&["--ticks"]).is_err());
        assert!(parse(&["--ticks", "many"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
        assert!(matches!(parse(&["-h"]), Ok(Parsed::Help)));
    }
}
