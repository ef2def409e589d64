use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Local WAV copy of the conditioned audio stream, one file per session.
///
/// The archive records exactly what is sent to the server: mono 16-bit PCM
/// at the target sample rate.
pub struct WavArchive {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    sample_count: usize,
}

impl WavArchive {
    /// Create `<dir>/<title_id>-<timestamp>.wav` and open it for writing.
    pub fn create(dir: &Path, title_id: &str, sample_rate: u32) -> Result<Self> {
        fs::create_dir_all(dir).context("Failed to create archive directory")?;

        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("{title_id}-{stamp}.wav"));

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV archive: {:?}", path))?;

        info!("Archiving session audio to {:?}", path);

        Ok(Self {
            writer: Some(writer),
            path,
            sample_count: 0,
        })
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV archive")?;
            }
            self.sample_count += samples.len();
        }
        Ok(())
    }

    /// Flush the RIFF header and close the file. Safe to call once; later
    /// writes become no-ops.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV archive")?;
            info!(
                "Archive complete: {:?} ({} samples)",
                self.path, self.sample_count
            );
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
}

impl Drop for WavArchive {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV archive on drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_writes_readable_wav() {
        let dir = tempfile::tempdir().unwrap();
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];

        let path = {
            let mut archive = WavArchive::create(dir.path(), "7", 16_000).unwrap();
            archive.write_samples(&samples).unwrap();
            archive.finalize().unwrap();
            archive.path().to_path_buf()
        };

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);

        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn finalize_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = WavArchive::create(dir.path(), "7", 16_000).unwrap();
        archive.write_samples(&[1, 2, 3]).unwrap();
        archive.finalize().unwrap();
        archive.finalize().unwrap();
        assert!(archive.write_samples(&[4]).is_ok());
        assert_eq!(archive.sample_count(), 3);
    }
}
