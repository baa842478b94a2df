use clap::Parser;
use keydash::clock::{Clock, ManualClock, SystemClock};
use keydash::config::{Config, ConfigStore, FileConfigStore};
use keydash::profile::{Personality, SimulatorConfig, SimulatorOverrides};
use keydash::race::GameMode;
use keydash::simulator::{RunStats, Simulator};
use keydash::stats::{HistoryDb, RunRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use time_humanize::{Accuracy, HumanTime, Tense};

const DEFAULT_TEXT: &str =
    "the quick brown fox jumps over the lazy dog, then does it all over again!";

/// headless typing race against a human-like simulated rival
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Runs a simulated rival typist over a prompt and reports its keystroke \
stream and final statistics. Runs are fast-forwarded through a virtual clock by default; \
pass --realtime to watch at human pace. Completed runs land in a local history database."
)]
pub struct Cli {
    /// rival temperament preset
    #[clap(short = 'p', long, value_enum)]
    personality: Option<Personality>,

    /// prompt text for the rival to type
    #[clap(short = 't', long)]
    text: Option<String>,

    /// polling cadence in milliseconds
    #[clap(long)]
    tick_ms: Option<u64>,

    /// cap the run at this many simulated seconds
    #[clap(short = 's', long)]
    seconds: Option<f64>,

    /// seed for a reproducible keystroke stream
    #[clap(long)]
    seed: Option<u64>,

    /// words-per-minute override
    #[clap(long)]
    speed: Option<f64>,

    /// per-character mistake probability override
    #[clap(long)]
    mistake_rate: Option<f64>,

    /// fatigue coefficient override
    #[clap(long)]
    fatigue: Option<f64>,

    /// race a second rival with this preset instead of a solo exhibition
    #[clap(long, value_enum)]
    duel: Option<Personality>,

    /// play at wall-clock pace instead of fast-forwarding
    #[clap(long)]
    realtime: bool,

    /// suppress the live keystroke stream
    #[clap(short = 'q', long)]
    quiet: bool,

    /// print recent runs and exit
    #[clap(long)]
    history: bool,

    /// export the whole run history as csv to this path and exit
    #[clap(long)]
    export: Option<PathBuf>,

    /// persist the resolved personality and cadence as defaults
    #[clap(long)]
    save_defaults: bool,
}

/// CLI flags resolved against the saved config.
#[derive(Debug, Clone)]
struct Settings {
    personality: Personality,
    text: String,
    tick: Duration,
    seconds: Option<f64>,
    overrides: SimulatorOverrides,
}

impl Settings {
    fn resolve(cli: &Cli, saved: &Config) -> Self {
        let mut overrides = saved.overrides;
        if cli.speed.is_some() {
            overrides.base_speed = cli.speed;
        }
        if cli.mistake_rate.is_some() {
            overrides.mistake_rate = cli.mistake_rate;
        }
        if cli.fatigue.is_some() {
            overrides.fatigue_factor = cli.fatigue;
        }

        Self {
            personality: cli.personality.unwrap_or(saved.personality),
            text: cli.text.clone().unwrap_or_else(|| DEFAULT_TEXT.to_string()),
            // A zero cadence would never advance the virtual clock.
            tick: Duration::from_millis(cli.tick_ms.unwrap_or(saved.tick_ms).max(1)),
            seconds: cli.seconds.or(saved.seconds),
            overrides,
        }
    }

    fn simulator_config(&self, personality: Personality) -> SimulatorConfig {
        SimulatorConfig::preset(personality).with_overrides(&self.overrides)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.history {
        return show_history();
    }
    if let Some(path) = &cli.export {
        return export_history(path);
    }

    let store = FileConfigStore::new();
    let settings = Settings::resolve(&cli, &store.load());

    if cli.save_defaults {
        let mut saved = store.load();
        saved.personality = settings.personality;
        saved.tick_ms = settings.tick.as_millis() as u64;
        saved.seconds = settings.seconds;
        saved.overrides = settings.overrides;
        store.save(&saved)?;
        println!("defaults saved");
    }

    match cli.duel {
        Some(challenger) => run_duel(&cli, &settings, challenger),
        None => run_exhibition(&cli, &settings),
    }
}

fn run_exhibition(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let stats = run_rival(cli.seed, settings, settings.personality, cli.realtime, cli.quiet);
    report(settings.personality, &stats);
    record(GameMode::Rival, settings.personality, &stats);
    Ok(())
}

fn run_duel(
    cli: &Cli,
    settings: &Settings,
    challenger: Personality,
) -> Result<(), Box<dyn Error>> {
    // Duels always fast-forward; two realtime streams would interleave.
    let home = run_rival(cli.seed, settings, settings.personality, false, true);
    let away = run_rival(cli.seed.map(|s| s ^ 1), settings, challenger, false, true);

    report(settings.personality, &home);
    report(challenger, &away);

    if (home.elapsed_secs - away.elapsed_secs).abs() < f64::EPSILON {
        println!("dead heat!");
    } else if home.elapsed_secs < away.elapsed_secs {
        println!("{} wins by {:.2}s", settings.personality, away.elapsed_secs - home.elapsed_secs);
    } else {
        println!("{} wins by {:.2}s", challenger, home.elapsed_secs - away.elapsed_secs);
    }

    record(GameMode::Rival, settings.personality, &home);
    record(GameMode::Rival, challenger, &away);
    Ok(())
}

/// Drive one rival over the prompt and return its final stats.
fn run_rival(
    seed: Option<u64>,
    settings: &Settings,
    personality: Personality,
    realtime: bool,
    quiet: bool,
) -> RunStats {
    let config = settings.simulator_config(personality);
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if realtime {
        let mut sim = Simulator::with_parts(config, rng, SystemClock);
        let tick = settings.tick;
        stream(&mut sim, settings, quiet, move || std::thread::sleep(tick))
    } else {
        let clock = ManualClock::new();
        let mut sim = Simulator::with_parts(config, rng, clock.clone());
        let tick = settings.tick;
        stream(&mut sim, settings, quiet, move || clock.advance(tick))
    }
}

fn stream<R: Rng, C: Clock>(
    sim: &mut Simulator<R, C>,
    settings: &Settings,
    quiet: bool,
    mut wait: impl FnMut(),
) -> RunStats {
    sim.start_run(&settings.text);
    while !sim.is_done() {
        wait();
        let emission = sim.next_emission();
        if !quiet && !emission.is_idle() {
            if emission.mistake {
                print!("[{}]", emission.keys);
            } else {
                print!("{}", emission.keys);
            }
            let _ = io::stdout().flush();
        }
        if matches!(settings.seconds, Some(cap) if sim.stats().elapsed_secs >= cap) {
            break;
        }
    }
    if !quiet {
        println!();
    }
    sim.stats()
}

fn report(personality: Personality, stats: &RunStats) {
    println!(
        "{}: {} keys, {} mistakes, {:.1}% accuracy, {:.2}s elapsed, ~{:.0} wpm",
        personality.to_string().to_lowercase(),
        stats.position,
        stats.mistakes,
        stats.accuracy,
        stats.elapsed_secs,
        wpm(stats),
    );
}

fn wpm(stats: &RunStats) -> f64 {
    if stats.elapsed_secs <= 0.0 {
        return 0.0;
    }
    (stats.position as f64 / 5.0) / (stats.elapsed_secs / 60.0)
}

/// Best-effort history write; a missing state dir never fails a run.
fn record(mode: GameMode, personality: Personality, stats: &RunStats) {
    if let Ok(db) = HistoryDb::new() {
        let _ = db.record_run(&RunRecord {
            mode: mode.to_string().to_lowercase(),
            personality: Some(personality.to_string().to_lowercase()),
            wpm: wpm(stats).round(),
            accuracy: stats.accuracy,
            mistakes: stats.mistakes as i64,
            elapsed_secs: stats.elapsed_secs,
            timestamp: chrono::Local::now(),
        });
    }
}

fn show_history() -> Result<(), Box<dyn Error>> {
    let db = HistoryDb::new()?;
    let runs = db.recent_runs(15)?;
    if runs.is_empty() {
        println!("no runs recorded yet");
        return Ok(());
    }

    for run in &runs {
        let since = (chrono::Local::now() - run.timestamp)
            .to_std()
            .unwrap_or_default();
        let ago = HumanTime::from(since).to_text_en(Accuracy::Rough, Tense::Past);
        println!(
            "{:>4.0} wpm  {:>5.1}% acc  {:>3} miss  {:<8} {:<10} {}",
            run.wpm,
            run.accuracy,
            run.mistakes,
            run.mode,
            run.personality.as_deref().unwrap_or("-"),
            ago,
        );
    }

    for (mode, avg_wpm, avg_acc, count) in db.mode_summary()? {
        println!(
            "{}: {} runs, {:.0} wpm avg, {:.1}% acc avg",
            mode, count, avg_wpm, avg_acc
        );
    }
    Ok(())
}

fn export_history(path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let db = HistoryDb::new()?;
    let file = std::fs::File::create(path)?;
    let rows = db.export_csv(file)?;
    println!("exported {} runs to {}", rows, path.display());
    Ok(())
}
