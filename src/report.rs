use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

// PER-TRIAL OUTPUT ------------------------------------------------------------

/// One fired tone. Timestamps are offsets from the trial epoch (the moment
/// acquisition was toggled on).
#[derive(Debug, Clone, Copy)]
pub struct FireRecord {
    pub peak_at: Duration,
    pub fired_at: Duration,
    pub target_delay: Duration,
    pub achieved_delay: Duration,
    /// The computed fire time had already passed when the peak arrived; the
    /// tone fired immediately instead. Callers use this to spot trials with
    /// compromised timing fidelity.
    pub late: bool,
}

/// Everything the logging collaborator reads back at trial end.
#[derive(Debug, Clone)]
pub struct TrialReport {
    pub tone_quota: usize,
    pub tones_fired: usize,
    pub peaks_seen: usize,
    /// Fire records in the order their peaks were accepted.
    pub records: Vec<FireRecord>,
}

impl TrialReport {
    pub fn late_count(&self) -> usize {
        self.records.iter().filter(|r| r.late).count()
    }

    pub fn quota_met(&self) -> bool {
        self.tones_fired >= self.tone_quota
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "tone",
            "peak_s",
            "fire_s",
            "target_delay_s",
            "achieved_delay_s",
            "late",
        ])?;
        for (index, record) in self.records.iter().enumerate() {
            csv_writer.write_record([
                (index + 1).to_string(),
                format!("{:.6}", record.peak_at.as_secs_f64()),
                format!("{:.6}", record.fired_at.as_secs_f64()),
                format!("{:.6}", record.target_delay.as_secs_f64()),
                format!("{:.6}", record.achieved_delay.as_secs_f64()),
                record.late.to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(csv::Error::from)?;
            }
        }
        let file = File::create(path).map_err(csv::Error::from)?;
        self.write_csv(file)
    }
}
