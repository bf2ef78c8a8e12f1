//! Colorful console output for clustering runs.
//!
//! Provides a custom `tracing` layer that formats engine events with colors.
//!
//! ## Log Levels
//!
//! - **INFO**: Lifecycle events (run/phase start/end, feasibility)
//! - **WARN**: Data fallbacks, oscillation, aborted repair
//! - **DEBUG**: One line per applied repair move

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();
static EPOCH: OnceLock<Instant> = OnceLock::new();
static RUN_START_NANOS: AtomicU64 = AtomicU64::new(0);

const DEFAULT_FILTER: &str = "storeforge_engine=info,storeforge=info";

/// Initializes console output.
///
/// Safe to call multiple times - only the first call has effect.
/// `RUST_LOG` overrides the default filter.
pub fn init() {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(ClusteringConsoleLayer)
            .try_init();
    });
}

fn mark_run_start() {
    let epoch = EPOCH.get_or_init(Instant::now);
    let nanos = epoch.elapsed().as_nanos() as u64;
    RUN_START_NANOS.store(nanos, Ordering::Relaxed);
}

fn elapsed_secs() -> f64 {
    let Some(epoch) = EPOCH.get() else {
        return 0.0;
    };
    let start_nanos = RUN_START_NANOS.load(Ordering::Relaxed);
    let now_nanos = epoch.elapsed().as_nanos() as u64;
    now_nanos.saturating_sub(start_nanos) as f64 / 1_000_000_000.0
}

/// A tracing layer that formats clustering events with colors.
pub struct ClusteringConsoleLayer;

impl<S: Subscriber> Layer<S> for ClusteringConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("storeforge") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor, *event.metadata().level());
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    phase: Option<String>,
    store: Option<String>,
    final_state: Option<String>,
    reason: Option<String>,
    repaired: Option<String>,
    error: Option<String>,
    stores: Option<u64>,
    min_stores: Option<u64>,
    max_stores: Option<u64>,
    clusters: Option<u64>,
    min_clusters: Option<u64>,
    max_clusters: Option<u64>,
    steps: Option<u64>,
    step: Option<u64>,
    iteration: Option<u64>,
    cluster: Option<u64>,
    from: Option<u64>,
    to: Option<u64>,
    moves: Option<u64>,
    unresolved: Option<u64>,
    duration_ms: Option<u64>,
    seed: Option<u64>,
    magnitude: Option<f64>,
    inertia: Option<f64>,
    max_covariate_range: Option<f64>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.record_str(field, s.trim_matches('"'));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let slot = match field.name() {
            "event" => &mut self.event,
            "phase" => &mut self.phase,
            "store" => &mut self.store,
            "final_state" => &mut self.final_state,
            "reason" => &mut self.reason,
            "repaired" => &mut self.repaired,
            "error" => &mut self.error,
            _ => return,
        };
        *slot = Some(value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        let slot = match field.name() {
            "stores" => &mut self.stores,
            "min_stores" => &mut self.min_stores,
            "max_stores" => &mut self.max_stores,
            "clusters" => &mut self.clusters,
            "min_clusters" => &mut self.min_clusters,
            "max_clusters" => &mut self.max_clusters,
            "steps" => &mut self.steps,
            "step" => &mut self.step,
            "iteration" => &mut self.iteration,
            "cluster" => &mut self.cluster,
            "from" => &mut self.from,
            "to" => &mut self.to,
            "moves" => &mut self.moves,
            "unresolved" => &mut self.unresolved,
            "duration_ms" => &mut self.duration_ms,
            "seed" => &mut self.seed,
            _ => return,
        };
        *slot = Some(value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        match field.name() {
            "magnitude" => self.magnitude = Some(value),
            "inertia" => self.inertia = Some(value),
            "max_covariate_range" => self.max_covariate_range = Some(value),
            _ => {}
        }
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    match v.event.as_deref().unwrap_or("") {
        "run_start" => format_run_start(v),
        "feasibility" => format_feasibility(v),
        "run_end" => format_run_end(v),
        "phase_start" => format_phase_start(v),
        "phase_end" => format_phase_end(v),
        "step" if level == Level::DEBUG => format_step(v),
        "data_incomplete" | "oscillation_detected" | "rebalance_aborted" => format_warning(v),
        "configuration_infeasible" => format!(
            "{} {} {}",
            format_elapsed(),
            "✗".bright_red().bold(),
            v.error.as_deref().unwrap_or("configuration infeasible").bright_red()
        ),
        _ => String::new(),
    }
}

fn format_elapsed() -> String {
    format!("{:>7.3}s", elapsed_secs())
        .bright_black()
        .to_string()
}

fn count(n: Option<u64>) -> String {
    n.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn format_run_start(v: &EventVisitor) -> String {
    mark_run_start();
    format!(
        "{} {} Clustering │ {} stores │ size {}..={} │ covariate range ≤ {} │ seed {}",
        format_elapsed(),
        "▶".bright_green().bold(),
        count(v.stores).bright_yellow(),
        count(v.min_stores).bright_yellow(),
        count(v.max_stores).bright_yellow(),
        format!("{:.2}", v.max_covariate_range.unwrap_or(0.0)).bright_yellow(),
        v.seed.unwrap_or(0).bright_black(),
    )
}

fn format_feasibility(v: &EventVisitor) -> String {
    format!(
        "{} {} Feasible cluster counts {}..={} │ seeding with {}",
        format_elapsed(),
        "◆".bright_cyan(),
        count(v.min_clusters).white(),
        count(v.max_clusters).white(),
        count(v.clusters).bright_magenta().bold(),
    )
}

fn format_run_end(v: &EventVisitor) -> String {
    let state = v.final_state.as_deref().unwrap_or("UNKNOWN");
    let status = format_final_state(state);
    format!(
        "{} {} Clustering complete │ {} │ {} clusters │ {} moves │ {} unresolved │ {}",
        format_elapsed(),
        "■".bright_cyan().bold(),
        status,
        count(v.clusters).white(),
        count(v.moves).white(),
        count(v.unresolved).white(),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow(),
    )
}

fn format_final_state(state: &str) -> String {
    if state == "CONVERGED" {
        state.bright_green().bold().to_string()
    } else {
        state.bright_red().bold().to_string()
    }
}

fn format_phase_start(v: &EventVisitor) -> String {
    let phase = v.phase.as_deref().unwrap_or("unknown");
    format!(
        "{} {} {} started",
        format_elapsed(),
        "▶".bright_blue(),
        phase.white().bold()
    )
}

fn format_phase_end(v: &EventVisitor) -> String {
    let phase = v.phase.as_deref().unwrap_or("unknown");
    let mut output = format!(
        "{} {} {} ended │ {}",
        format_elapsed(),
        "◀".bright_blue(),
        phase.white().bold(),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow(),
    );
    if let Some(steps) = v.steps {
        output.push_str(&format!(
            " │ {} moves",
            steps.to_formatted_string(&Locale::en).white()
        ));
    }
    if let Some(inertia) = v.inertia {
        output.push_str(&format!(" │ inertia {}", format!("{inertia:.3}").bright_magenta()));
    }
    if let Some(ref state) = v.final_state {
        output.push_str(&format!(" │ {}", format_final_state(state)));
    }
    output
}

fn format_step(v: &EventVisitor) -> String {
    format!(
        "{} {} Move {:>6} │ {} {} → {} │ {} │ magnitude {}",
        format_elapsed(),
        "↻".bright_cyan(),
        count(v.step).bright_black(),
        v.store.as_deref().unwrap_or("?").white(),
        count(v.from),
        count(v.to),
        v.repaired.as_deref().unwrap_or("?").bright_black(),
        format_magnitude(v.magnitude.unwrap_or(0.0)),
    )
}

fn format_warning(v: &EventVisitor) -> String {
    let detail = match v.event.as_deref() {
        Some("data_incomplete") => format!(
            "store {} has no reference season, using recent season only",
            v.store.as_deref().unwrap_or("?")
        ),
        Some("oscillation_detected") => format!(
            "store {} returned to cluster {} at move {}, pinned",
            v.store.as_deref().unwrap_or("?"),
            count(v.cluster),
            count(v.iteration)
        ),
        _ => format!(
            "repair aborted ({}) │ {} unresolved │ magnitude {:.3}",
            v.reason.as_deref().unwrap_or("unknown"),
            count(v.unresolved),
            v.magnitude.unwrap_or(0.0)
        ),
    };
    format!("{} {} {}", format_elapsed(), "⚠".yellow().bold(), detail.yellow())
}

fn format_magnitude(magnitude: f64) -> String {
    let text = format!("{magnitude:.3}");
    if magnitude <= 0.0 {
        text.bright_green().to_string()
    } else {
        text.bright_red().to_string()
    }
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}
