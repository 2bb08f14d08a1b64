use crate::error::Result;
use crate::extractor::TickerRecord;
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        ResultWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn write(&self, mut records: Vec<TickerRecord>, file_name: &str) -> Result<usize> {
        records.sort_by(|a, b| a.nse_code().cmp(b.nse_code()));
        records.dedup_by(|a, b| a.nse_code() == b.nse_code());

        if records.is_empty() {
            warn!("No NSE codes found across all pages");
            return Ok(0);
        }

        let path = self.path_for(file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.write_all(render_line(&records).as_bytes())?;

        info!("Total NSE codes collected: {} -> {}", records.len(), path.display());
        Ok(records.len())
    }
}

pub fn render_line(records: &[TickerRecord]) -> String {
    records
        .iter()
        .map(|record| format!("NSE:{}", record.nse_code()))
        .collect::<Vec<_>>()
        .join(", ")
}
