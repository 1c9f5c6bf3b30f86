//! Durable feedback store.
//!
//! Every time the human corrects (or confirms) a machine-chosen level,
//! the full sensor context and both levels are appended as one CSV row.
//! The file is append-only and parsed tolerantly on load: the header and
//! any malformed row are skipped, never fatal, so one corrupted line
//! cannot poison the training corpus.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use pulsegate_shared::StressLevel;

use crate::error::{EngineError, EngineResult};
use crate::sample::SensorContext;

const CSV_HEADER: &str = "heart_rate,hr_average,hr_trend,temperature,temp_delta,gsr,gsr_average,gsr_trend,edge_count,time_since_edge_sec,current_level,session_time_sec,ai_level,user_level,correction,timestamp_ms";
const CSV_COLUMNS: usize = 16;

/// One labelled training example. The label is always the human's
/// choice; the machine's own pick is kept for correction analysis only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSample {
    pub context: SensorContext,
    pub ai_level: StressLevel,
    pub user_level: StressLevel,
    /// Signed level distance, user minus machine.
    pub correction: i32,
    pub timestamp_ms: u32,
}

impl FeedbackSample {
    pub fn new(
        context: SensorContext,
        ai_level: StressLevel,
        user_level: StressLevel,
        timestamp_ms: u32,
    ) -> Self {
        Self {
            context,
            ai_level,
            user_level,
            correction: user_level.index() as i32 - ai_level.index() as i32,
            timestamp_ms,
        }
    }

    fn to_csv_row(&self) -> String {
        let c = &self.context;
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            c.heart_rate,
            c.hr_average,
            c.hr_trend,
            c.temperature,
            c.temp_delta,
            c.gsr,
            c.gsr_average,
            c.gsr_trend,
            c.edge_count,
            c.time_since_edge_sec,
            c.current_level.index(),
            c.session_time_sec,
            self.ai_level.index(),
            self.user_level.index(),
            self.correction,
            self.timestamp_ms,
        )
    }

    fn from_csv_row(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != CSV_COLUMNS {
            return None;
        }

        let context = SensorContext {
            heart_rate: fields[0].parse().ok()?,
            hr_average: fields[1].parse().ok()?,
            hr_trend: fields[2].parse().ok()?,
            temperature: fields[3].parse().ok()?,
            temp_delta: fields[4].parse().ok()?,
            gsr: fields[5].parse().ok()?,
            gsr_average: fields[6].parse().ok()?,
            gsr_trend: fields[7].parse().ok()?,
            edge_count: fields[8].parse().ok()?,
            time_since_edge_sec: fields[9].parse().ok()?,
            current_level: StressLevel::from_index(fields[10].parse().ok()?)?,
            session_time_sec: fields[11].parse().ok()?,
        };

        Some(Self {
            context,
            ai_level: StressLevel::from_index(fields[12].parse().ok()?)?,
            user_level: StressLevel::from_index(fields[13].parse().ok()?)?,
            correction: fields[14].parse().ok()?,
            timestamp_ms: fields[15].parse().ok()?,
        })
    }
}

/// Append-only CSV feedback log plus the in-session buffer.
#[derive(Debug)]
pub struct FeedbackStore {
    path: PathBuf,
    session: Vec<FeedbackSample>,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            session: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples collected since the store was opened.
    pub fn session_samples(&self) -> &[FeedbackSample] {
        &self.session
    }

    /// Appends a sample to the session buffer and the durable log.
    ///
    /// The in-memory buffer always takes the sample; a failed disk write
    /// surfaces as [`EngineError::StorageWriteFailed`] but loses nothing
    /// in memory.
    pub fn append(&mut self, sample: FeedbackSample) -> EngineResult<()> {
        self.session.push(sample);
        self.append_durable(&sample)
    }

    fn append_durable(&self, sample: &FeedbackSample) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| EngineError::storage(&self.path, e))?;
            }
        }

        let write_header = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| EngineError::storage(&self.path, e))?;

        if write_header {
            writeln!(file, "{CSV_HEADER}").map_err(|e| EngineError::storage(&self.path, e))?;
        }
        writeln!(file, "{}", sample.to_csv_row())
            .map_err(|e| EngineError::storage(&self.path, e))?;
        Ok(())
    }

    /// Loads every parseable durable sample. A missing file is an empty
    /// corpus, not an error.
    pub fn load_all(&self) -> Vec<FeedbackSample> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Vec::new(),
        };

        contents
            .lines()
            .filter_map(FeedbackSample::from_csv_row)
            .collect()
    }

    /// Number of parseable durable samples.
    ///
    /// Re-reads the whole file; call it from training or UI paths,
    /// never per tick.
    pub fn durable_count(&self) -> usize {
        self.load_all().len()
    }

    pub fn clear_session(&mut self) {
        self.session.clear();
    }
}
