use colored::Colorize;
use heartsync::audio::{AudioSink, ConsoleSink};
use heartsync::hardware::simulated::{SimulatedEcg, SimulatedEcgConfig};
use heartsync::{Config, CoreError, TrialSession};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Runs one trial against the simulated ECG feed and prints the timing log.
fn main() {
    let mut config = Config::default();
    config.scheduler.tone_count = 5;
    config.session.warm_up_s = 1.0;

    let mut feed_config = SimulatedEcgConfig::default();
    feed_config.sample_rate_hz = config.session.sample_rate_hz;
    let feed = SimulatedEcg::new(feed_config);
    let audio: Arc<Mutex<dyn AudioSink>> = Arc::new(Mutex::new(ConsoleSink));
    let mut session = TrialSession::new(feed, audio, config);

    if let Err(error) = run_trial(&mut session) {
        eprintln!("{} {}", "error:".red().bold(), error);
        std::process::exit(1);
    }
}

fn run_trial(session: &mut TrialSession<SimulatedEcg>) -> Result<(), CoreError> {
    session.connect()?;
    println!("{}", "connected, starting trial".green());

    session.start_trial()?;
    if !session.wait_for_completion(Duration::from_secs(30)) {
        println!("{}", "timeout, aborting trial".yellow());
        session.abort_trial();
    }
    let report = session.finish_trial()?;

    println!(
        "fired {}/{} tones over {} accepted peaks ({} late)",
        report.tones_fired,
        report.tone_quota,
        report.peaks_seen,
        report.late_count()
    );
    for (index, record) in report.records.iter().enumerate() {
        println!(
            "  tone {}: peak at {:>8.3}s, fired at {:>8.3}s, delay {:.1}ms (target {:.1}ms){}",
            index + 1,
            record.peak_at.as_secs_f64(),
            record.fired_at.as_secs_f64(),
            record.achieved_delay.as_secs_f64() * 1e3,
            record.target_delay.as_secs_f64() * 1e3,
            if record.late { " LATE".red().to_string() } else { String::new() }
        );
    }

    if let Err(error) = report.save_csv("logs/trial.csv") {
        eprintln!("{} could not write logs/trial.csv: {}", "warning:".yellow(), error);
    } else {
        println!("{}", "timing log written to logs/trial.csv".green());
    }
    Ok(())
}
