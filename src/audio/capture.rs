use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::archive::WavArchive;
use super::queue::FrameQueue;
use super::resample::{downsample_to_pcm16, pcm16_to_bytes, TARGET_SAMPLE_RATE};

/// Microphone capture configuration.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Rate the server expects. Device audio is decimated down to this.
    pub target_sample_rate: u32,
    /// Directory for the optional local WAV copy of the session audio.
    pub archive_dir: Option<PathBuf>,
    /// Session identifier used in archive filenames.
    pub session_label: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
            archive_dir: None,
            session_label: "session".to_string(),
        }
    }
}

/// Exclusive handle on the microphone.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated worker
/// thread; the handle only carries the stop flag and the thread join handle.
/// Each raw device block is decimated to the target rate, quantized to
/// 16-bit PCM and appended to the shared [`FrameQueue`]; the send tick on
/// the session side drains it.
pub struct MicCapture {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MicCapture {
    /// Acquire the default input device and start capturing.
    ///
    /// Fails if no device is available or the stream cannot be built; the
    /// caller surfaces that to the user, there is no automatic retry.
    pub fn open(config: CaptureConfig, queue: Arc<Mutex<FrameQueue>>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let worker_stop = Arc::clone(&stop);
        let worker = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                capture_worker(config, queue, worker_stop, ready_tx);
            })
            .context("Failed to spawn capture thread")?;

        // The worker reports whether the device opened before we return.
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop,
                worker: Some(worker),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(anyhow!("Capture thread exited before opening the device"))
            }
        }
    }

    /// Release the microphone, the stream and any buffered frames.
    ///
    /// Idempotent: safe to call repeatedly and from any state.
    pub fn close(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
            info!("Microphone released");
        }
    }

    pub fn is_open(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.close();
    }
}

fn capture_worker(
    config: CaptureConfig,
    queue: Arc<Mutex<FrameQueue>>,
    stop: Arc<AtomicBool>,
    ready_tx: mpsc::Sender<Result<()>>,
) {
    let archive = match open_archive(&config) {
        Ok(a) => Arc::new(Mutex::new(a)),
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let stream = match build_stream(&config, Arc::clone(&queue), Arc::clone(&archive)) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(anyhow!("Failed to start input stream: {e}")));
        return;
    }

    let _ = ready_tx.send(Ok(()));
    debug!("Capture worker running");

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);

    // Frames captured after the last drain are discarded with the session.
    if let Ok(mut q) = queue.lock() {
        q.clear();
    }
    if let Ok(mut a) = archive.lock() {
        if let Some(archive) = a.as_mut() {
            if let Err(e) = archive.finalize() {
                warn!("Failed to finalize session archive: {}", e);
            }
        }
    }

    debug!("Capture worker stopped");
}

fn open_archive(config: &CaptureConfig) -> Result<Option<WavArchive>> {
    match &config.archive_dir {
        Some(dir) => {
            let archive = WavArchive::create(dir, &config.session_label, config.target_sample_rate)?;
            Ok(Some(archive))
        }
        None => Ok(None),
    }
}

fn build_stream(
    config: &CaptureConfig,
    queue: Arc<Mutex<FrameQueue>>,
    archive: Arc<Mutex<Option<WavArchive>>>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let supported = device
        .default_input_config()
        .context("Failed to query input device configuration")?;

    let device_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();

    info!(
        "Capturing from {:?} at {} Hz ({} ch, {:?})",
        device_name, device_rate, channels, sample_format
    );

    let target_rate = config.target_sample_rate;
    let on_error = |e: cpal::StreamError| warn!("Input stream error: {}", e);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| {
                let mono = first_channel(data, channels);
                push_block(&mono, device_rate, target_rate, &queue, &archive);
            },
            on_error,
            None,
        )?,
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                let floats: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                let mono = first_channel(&floats, channels);
                push_block(&mono, device_rate, target_rate, &queue, &archive);
            },
            on_error,
            None,
        )?,
        other => return Err(anyhow!("Unsupported input sample format: {other:?}")),
    };

    Ok(stream)
}

/// Pick the first channel out of interleaved device data.
fn first_channel(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.iter()
        .step_by(channels as usize)
        .copied()
        .collect()
}

fn push_block(
    block: &[f32],
    device_rate: u32,
    target_rate: u32,
    queue: &Arc<Mutex<FrameQueue>>,
    archive: &Arc<Mutex<Option<WavArchive>>>,
) {
    let samples = downsample_to_pcm16(block, device_rate, target_rate);
    if samples.is_empty() {
        return;
    }

    if let Ok(mut a) = archive.lock() {
        if let Some(archive) = a.as_mut() {
            if let Err(e) = archive.write_samples(&samples) {
                warn!("Archive write failed: {}", e);
            }
        }
    }

    if let Ok(mut q) = queue.lock() {
        q.push(pcm16_to_bytes(&samples));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent() {
        // A handle whose worker already went away must tolerate repeated
        // close calls without faulting.
        let mut capture = MicCapture {
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        };
        capture.close();
        capture.close();
        assert!(!capture.is_open());
        assert!(capture.stop.load(Ordering::SeqCst));
    }

    #[test]
    fn first_channel_deinterleaves_stereo() {
        let data = vec![0.1, 0.9, 0.2, 0.8, 0.3, 0.7];
        assert_eq!(first_channel(&data, 2), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn first_channel_passes_mono_through() {
        let data = vec![0.1, 0.2];
        assert_eq!(first_channel(&data, 1), data);
    }
}
