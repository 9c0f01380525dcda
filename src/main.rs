use std::path::PathBuf;
use std::process::ExitCode;

use reroll_vision::{
    CharacterDetector, DetectionConfig, DetectionReport, ExemplarPool, FeatureGranularity,
    render_overlay,
};

#[derive(Debug)]
struct Args {
    screenshot: PathBuf,
    exemplars: PathBuf,
    threshold: Option<f32>,
    dedup: Option<f32>,
    per_exemplar: bool,
    debug_image: Option<PathBuf>,
    json: bool,
}

impl Args {
    fn parse() -> Option<Self> {
        let argv: Vec<String> = std::env::args().collect();

        let mut screenshot: Option<PathBuf> = None;
        let mut exemplars: Option<PathBuf> = None;
        let mut threshold: Option<f32> = None;
        let mut dedup: Option<f32> = None;
        let mut per_exemplar = false;
        let mut debug_image: Option<PathBuf> = None;
        let mut json = false;

        for arg in argv.iter().skip(1) {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!("reroll-vision v{}", env!("CARGO_PKG_VERSION"));
                return None;
            } else if let Some(rest) = arg.strip_prefix("--screenshot=") {
                screenshot = Some(PathBuf::from(rest));
            } else if let Some(rest) = arg.strip_prefix("--exemplars=") {
                exemplars = Some(PathBuf::from(rest));
            } else if let Some(rest) = arg.strip_prefix("--threshold=") {
                match rest.parse::<f32>() {
                    Ok(value) if (0.0..=1.0).contains(&value) => threshold = Some(value),
                    _ => {
                        eprintln!("❌ Invalid threshold '{rest}', expected a value in [0.0, 1.0]");
                        return None;
                    }
                }
            } else if let Some(rest) = arg.strip_prefix("--dedup=") {
                match rest.parse::<f32>() {
                    Ok(value) if value >= 0.0 => dedup = Some(value),
                    _ => {
                        eprintln!("❌ Invalid dedup distance '{rest}'");
                        return None;
                    }
                }
            } else if arg == "--per-exemplar" {
                per_exemplar = true;
            } else if let Some(rest) = arg.strip_prefix("--debug-image=") {
                debug_image = Some(PathBuf::from(rest));
            } else if arg == "--json" {
                json = true;
            } else {
                eprintln!("❌ Unknown argument: {arg}");
                print_help();
                return None;
            }
        }

        let (Some(screenshot), Some(exemplars)) = (screenshot, exemplars) else {
            eprintln!("❌ Both --screenshot= and --exemplars= are required");
            print_help();
            return None;
        };

        Some(Args {
            screenshot,
            exemplars,
            threshold,
            dedup,
            per_exemplar,
            debug_image,
            json,
        })
    }
}

fn print_help() {
    println!("🔍 Reroll Vision: character detection for gacha screenshots");
    println!();
    println!("USAGE:");
    println!("    reroll-vision --screenshot=PATH --exemplars=DIR [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --screenshot=PATH    Screenshot image to analyze");
    println!("    --exemplars=DIR      Directory of character reference images");
    println!("    --threshold=F        Confidence floor in [0.0, 1.0] (default 0.7)");
    println!("    --dedup=PX           Deduplication distance in pixels (default 80)");
    println!("    --per-exemplar       Feature-match exemplar-by-exemplar instead of pooled");
    println!("    --debug-image=PATH   Write an annotated overlay image");
    println!("    --json               Print the full report as JSON");
    println!("    --help, -h           Show this help message");
    println!("    --version, -v        Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    reroll-vision --screenshot=pull.png --exemplars=characters/");
    println!("    reroll-vision --screenshot=pull.png --exemplars=characters/ --dedup=150 --json");
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(args) = Args::parse() else {
        return ExitCode::FAILURE;
    };

    let mut config = DetectionConfig::default();
    if let Some(threshold) = args.threshold {
        config.confidence_floor = threshold;
    }
    if let Some(dedup) = args.dedup {
        config.dedup_distance = dedup;
    }
    if args.per_exemplar {
        config.feature.granularity = FeatureGranularity::PerExemplar;
    }

    let (pool, warnings) = match ExemplarPool::load_dir(&args.exemplars, &config.feature) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Failed to build exemplar pool: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!(
        "📚 Learned {} exemplar(s), {} pooled feature(s)",
        pool.len(),
        pool.feature_count()
    );
    for warning in &warnings {
        println!("⚠️ {}", warning.message);
    }

    let detector = CharacterDetector::new(pool, config);
    let report = match detector.detect_path(&args.screenshot) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("❌ Detection failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("❌ Failed to serialize report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&report);
    }

    if let Some(path) = &args.debug_image {
        match image::open(&args.screenshot) {
            Ok(screenshot) => {
                let overlay = render_overlay(&screenshot, &report.detections);
                if let Err(e) = overlay.save(path) {
                    eprintln!("❌ Failed to write debug image: {e}");
                    return ExitCode::FAILURE;
                }
                println!("🖼️ Debug overlay saved to {}", path.display());
            }
            Err(e) => {
                eprintln!("❌ Failed to re-open screenshot for overlay: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn print_report(report: &DetectionReport) {
    println!(
        "🎯 {} character instance(s) found ({} detection(s), {}ms)",
        report.instance_count(),
        report.detections.len(),
        report.processing_time_ms
    );
    for (i, detection) in report.detections.iter().enumerate() {
        let location = match detection.location {
            Some(p) => format!("({},{})", p.x, p.y),
            None => "(no location)".to_string(),
        };
        println!(
            "  {}. {} at {} conf={:.3} via {:?}",
            i + 1,
            detection.source,
            location,
            detection.confidence,
            detection.method()
        );
    }
    for warning in &report.warnings {
        println!("⚠️ {}", warning.message);
    }
}
