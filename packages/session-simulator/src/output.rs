//! Output writers for simulation results.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::simulator::SessionSummary;

/// Flat per-session row for the CSV summary.
#[derive(Debug, Serialize)]
struct CsvSummaryRow {
    index: u64,
    session_id: String,
    mode: String,
    players: usize,
    status: String,
    end_reason: String,
    rounds: u32,
    turns: u32,
    attempts: usize,
    correct: usize,
    hints: u32,
    timeouts: u32,
    top_score: i64,
    sim_seconds: i64,
}

impl From<&SessionSummary> for CsvSummaryRow {
    fn from(s: &SessionSummary) -> Self {
        Self {
            index: s.index,
            session_id: s.session_id.to_string(),
            mode: format!("{:?}", s.mode),
            players: s.players,
            status: format!("{:?}", s.status),
            end_reason: s.end_reason.map(|r| format!("{r:?}")).unwrap_or_default(),
            rounds: s.rounds,
            turns: s.turns,
            attempts: s.attempts,
            correct: s.correct,
            hints: s.hints,
            timeouts: s.timeouts,
            top_score: s.standings.first().map(|st| st.score).unwrap_or(0),
            sim_seconds: s.sim_seconds,
        }
    }
}

pub struct OutputWriter {
    jsonl_writer: BufWriter<File>,
    csv_writer: csv::Writer<BufWriter<File>>,
    jsonl_path: PathBuf,
    csv_path: PathBuf,
}

impl OutputWriter {
    pub fn new(output_dir: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let dir = Path::new(output_dir);
        std::fs::create_dir_all(dir)?;

        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Iso8601::DEFAULT)
            .unwrap_or_else(|_| "unknown".to_string())
            .replace(':', "-");

        let jsonl_path = dir.join(format!("sessions_{timestamp}.jsonl"));
        let jsonl_writer = BufWriter::new(create(&jsonl_path)?);

        let csv_path = dir.join(format!("sessions_{timestamp}_summary.csv"));
        let csv_writer = csv::Writer::from_writer(BufWriter::new(create(&csv_path)?));

        Ok(Self {
            jsonl_writer,
            csv_writer,
            jsonl_path,
            csv_path,
        })
    }

    pub fn write_session(
        &mut self,
        summary: &SessionSummary,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(summary)?;
        writeln!(self.jsonl_writer, "{json}")?;
        self.csv_writer.serialize(CsvSummaryRow::from(summary))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.jsonl_writer.flush()?;
        self.csv_writer.flush()?;
        Ok(())
    }

    pub fn output_paths(&self) -> (&Path, &Path) {
        (&self.jsonl_path, &self.csv_path)
    }
}

fn create(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}
