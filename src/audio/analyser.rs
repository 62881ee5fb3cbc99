// Frequency analysis graph
//
// Turns a rolling window of time-domain samples into byte-scaled
// frequency energies, the same snapshot a browser analyser node hands out:
// Blackman window, forward FFT, 1/N magnitude, exponential smoothing across
// snapshots, then decibels mapped linearly from [min_db, max_db] onto 0-255.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::CaptureError;

/// Configuration for the frequency analysis graph
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyserConfig {
    /// FFT window length in samples (power of two)
    pub fft_size: usize,
    /// Energy mapped to byte 0
    pub min_decibels: f32,
    /// Energy mapped to byte 255
    pub max_decibels: f32,
    /// Weight of the previous snapshot when smoothing (0 = none)
    pub smoothing_time_constant: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            min_decibels: -90.0,
            max_decibels: -10.0,
            smoothing_time_constant: 0.85,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins per snapshot
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(CaptureError::Unsupported(format!(
                "fft_size must be a power of two between 32 and 32768, got {}",
                self.fft_size
            )));
        }

        if self.min_decibels >= self.max_decibels {
            return Err(CaptureError::Unsupported(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }

        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(CaptureError::Unsupported(format!(
                "smoothing_time_constant must be within [0, 1], got {}",
                self.smoothing_time_constant
            )));
        }

        Ok(())
    }
}

/// Rolling window of the most recent mono samples
#[derive(Debug)]
pub struct SampleWindow {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Copy the window, oldest first, into `out`
    pub fn copy_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.samples.iter().copied());
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// FFT-based analyser producing byte frequency data
pub struct FrequencyAnalyser {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl FrequencyAnalyser {
    pub fn new(config: AnalyserConfig) -> Self {
        let n = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(n);

        // Blackman window (alpha = 0.16)
        let window = (0..n)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Self {
            fft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; config.bin_count()],
            config,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.config.bin_count()
    }

    /// Analyse the most recent `fft_size` samples into `bins`
    ///
    /// Fewer samples than `fft_size` are zero-padded at the front. Extra bins
    /// in `bins` beyond `bin_count()` are left untouched.
    pub fn byte_frequency_data(&mut self, samples: &[f32], bins: &mut [u8]) {
        let n = self.config.fft_size;
        let tail = &samples[samples.len().saturating_sub(n)..];
        let offset = n - tail.len();

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < offset { 0.0 } else { tail[i - offset] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let tau = self.config.smoothing_time_constant;
        let scale = 1.0 / n as f32;
        let range = self.config.max_decibels - self.config.min_decibels;

        for (k, out) in bins.iter_mut().enumerate().take(self.bin_count()) {
            let magnitude = self.buffer[k].norm() * scale;
            let mut smoothed = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            if !smoothed.is_finite() {
                smoothed = 0.0;
            }
            self.smoothed[k] = smoothed;

            let db = 20.0 * smoothed.log10();
            let scaled = (255.0 / range) * (db - self.config.min_decibels);
            *out = if scaled.is_finite() {
                scaled.floor().clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }

    /// Forget smoothing history
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }
}
