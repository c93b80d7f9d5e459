use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use hazard_alert::alert::AlertConfig;
use hazard_alert::fetcher::ReportFetcher;
use hazard_alert::position::Position;
use hazard_alert::route::{hazards_on_route, RoutePath, DEFAULT_CORRIDOR_M};
use hazard_alert::tracker::{run_session, PositionEvent, TrackingSession};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

#[derive(Parser, Debug)]
#[command(name = "navigate")]
#[command(about = "Live pothole proximity alerts - replay or simulated drive", long_about = None)]
struct Args {
    /// Backend base URL for the /reports feed
    #[arg(long, default_value = "http://localhost:5000")]
    backend: String,

    /// Local reports file used when the backend is unreachable
    #[arg(long)]
    reports_file: Option<PathBuf>,

    /// Alert radius in meters
    #[arg(long, default_value = "500")]
    radius: f64,

    /// Disable the audible alert cue
    #[arg(long)]
    mute: bool,

    /// Replay position fixes from a JSON file (array of {lat, lon, ...})
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Simulated drive start, "lat,lon"
    #[arg(long)]
    from: Option<String>,

    /// Simulated drive end, "lat,lon"
    #[arg(long)]
    to: Option<String>,

    /// Number of fixes for a simulated drive
    #[arg(long, default_value = "20")]
    steps: usize,

    /// Milliseconds between simulated fixes
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Print hazards on the straight --from/--to route and exit
    #[arg(long)]
    route_only: bool,

    /// Route corridor threshold in meters
    #[arg(long, default_value_t = DEFAULT_CORRIDOR_M)]
    route_threshold: f64,

    /// Output directory for session stats
    #[arg(long, default_value = "navigation_sessions")]
    output_dir: String,
}

fn parse_latlon(raw: &str) -> Result<(f64, f64)> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("expected \"lat,lon\", got {:?}", raw))?;
    Ok((
        lat.trim().parse::<f64>().context("invalid latitude")?,
        lon.trim().parse::<f64>().context("invalid longitude")?,
    ))
}

fn load_replay(path: &PathBuf) -> Result<Vec<Position>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading replay file {}", path.display()))?;
    let fixes: Vec<Position> = serde_json::from_str(&body).context("parsing replay file")?;
    Ok(fixes)
}

fn interpolate(start: (f64, f64), end: (f64, f64), steps: usize) -> Vec<Position> {
    let n = steps.max(2);
    (0..n)
        .map(|i| {
            let t = i as f64 / (n - 1) as f64;
            Position::new(
                start.0 + t * (end.0 - start.0),
                start.1 + t * (end.1 - start.1),
            )
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("[{}] Hazard Alert Navigator", Utc::now().format("%H:%M:%S"));
    println!("  Backend: {}", args.backend);
    println!("  Alert radius: {}m", args.radius);

    let mut fetcher = ReportFetcher::new(&args.backend);
    if let Some(path) = &args.reports_file {
        fetcher = fetcher.with_fallback(path.clone());
    }

    if args.route_only {
        return route_report(&args, &fetcher).await;
    }

    let fixes = if let Some(path) = &args.replay {
        load_replay(path)?
    } else {
        let from = parse_latlon(
            args.from
                .as_deref()
                .ok_or_else(|| anyhow!("--from is required without --replay"))?,
        )?;
        let to = parse_latlon(
            args.to
                .as_deref()
                .ok_or_else(|| anyhow!("--to is required without --replay"))?,
        )?;
        interpolate(from, to, args.steps)
    };
    println!("  Position fixes: {}", fixes.len());

    std::fs::create_dir_all(&args.output_dir)?;

    let config = AlertConfig {
        alert_radius_m: args.radius,
        sound_enabled: !args.mute,
        ..AlertConfig::default()
    };
    let session = TrackingSession::new(config);

    let (tx, rx) = mpsc::channel::<PositionEvent>(64);
    let interval_ms = args.interval_ms;
    let feeder = tokio::spawn(async move {
        for fix in fixes {
            if tx.send(PositionEvent::Fix(fix)).await.is_err() {
                break;
            }
            sleep(Duration::from_millis(interval_ms)).await;
        }
        // Sender drops here; the session loop ends like a cleared watch.
    });

    let session = run_session(session, rx, fetcher, |update| {
        for alert in update.top_alerts(3) {
            let marker = match alert.urgency {
                hazard_alert::Urgency::Critical => "!!!",
                hazard_alert::Urgency::High => " !!",
                hazard_alert::Urgency::Warning => "  !",
            };
            println!("{} {}", marker, alert.message);
        }
        if update.play_tone {
            // Terminal bell stands in for the UI's oscillator beep.
            print!("\x07");
        }
    })
    .await;
    feeder.await?;

    let stats = session.stats();
    println!("\n[{}] Session complete", Utc::now().format("%H:%M:%S"));
    println!("  Fixes processed: {}", stats.position_fixes);
    println!("  Distance: {:.0}m", stats.total_distance_m);
    println!("  Alerts shown: {}", stats.alerts_shown);
    println!("  Hazards passed: {}", stats.hazards_passed);

    let stats_path = format!(
        "{}/session_{}.json",
        args.output_dir,
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    stats.save(&stats_path)?;
    println!("  Stats written to {}", stats_path);

    Ok(())
}

async fn route_report(args: &Args, fetcher: &ReportFetcher) -> Result<()> {
    let from = parse_latlon(
        args.from
            .as_deref()
            .ok_or_else(|| anyhow!("--route-only requires --from"))?,
    )?;
    let to = parse_latlon(
        args.to
            .as_deref()
            .ok_or_else(|| anyhow!("--route-only requires --to"))?,
    )?;

    let snapshot = fetcher
        .fetch_snapshot()
        .await
        .map_err(|e| anyhow!("hazard fetch failed: {}", e))?;

    let route = RoutePath::straight(from, to);
    let on_route = hazards_on_route(&snapshot, &route, args.route_threshold);

    println!(
        "Route {:.5},{:.5} -> {:.5},{:.5} ({:.0}m)",
        from.0,
        from.1,
        to.0,
        to.1,
        route.length_m()
    );
    println!(
        "{} of {} reports within {:.0}m of the route:",
        on_route.len(),
        snapshot.len(),
        args.route_threshold
    );
    for hazard in &on_route {
        let (lat, lon) = hazard.coords().unwrap_or((0.0, 0.0));
        println!("  [{}] {} at {:.5},{:.5}", hazard.severity(), hazard.id, lat, lon);
    }

    Ok(())
}
