// Tests for the frequency analysis graph

use quiet_read::audio::{AnalyserConfig, FrequencyAnalyser, SampleWindow};
use quiet_read::error::CaptureError;
use quiet_read::noise::scale_energies;

fn sine(frequency: f32, sample_rate: f32, amplitude: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin() * amplitude)
        .collect()
}

#[test]
fn test_default_config_matches_browser_analyser() {
    let config = AnalyserConfig::default();
    assert_eq!(config.fft_size, 512);
    assert_eq!(config.bin_count(), 256);
    assert_eq!(config.min_decibels, -90.0);
    assert_eq!(config.max_decibels, -10.0);
    assert_eq!(config.smoothing_time_constant, 0.85);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_configs_are_rejected() {
    let bad = [
        AnalyserConfig {
            fft_size: 500,
            ..Default::default()
        },
        AnalyserConfig {
            fft_size: 16,
            ..Default::default()
        },
        AnalyserConfig {
            min_decibels: -10.0,
            max_decibels: -90.0,
            ..Default::default()
        },
        AnalyserConfig {
            smoothing_time_constant: 1.5,
            ..Default::default()
        },
    ];

    for config in bad {
        assert!(matches!(
            config.validate(),
            Err(CaptureError::Unsupported(_))
        ));
    }
}

#[test]
fn test_silence_yields_zero_bins() {
    let mut analyser = FrequencyAnalyser::new(AnalyserConfig::default());
    let mut bins = vec![1u8; analyser.bin_count()];

    analyser.byte_frequency_data(&[0.0; 512], &mut bins);

    assert!(bins.iter().all(|&b| b == 0));
    assert_eq!(scale_energies(&bins), 0);
}

#[test]
fn test_tone_energy_lands_in_its_bin() {
    let config = AnalyserConfig {
        smoothing_time_constant: 0.0,
        ..Default::default()
    };
    let mut analyser = FrequencyAnalyser::new(config);
    let mut bins = vec![0u8; analyser.bin_count()];

    // 48 kHz / 512 = 93.75 Hz per bin; bin 32 is 3 kHz
    let samples = sine(3000.0, 48000.0, 0.5, 512);
    analyser.byte_frequency_data(&samples, &mut bins);

    let peak = bins
        .iter()
        .enumerate()
        .max_by_key(|(_, b)| **b)
        .map(|(i, _)| i)
        .unwrap();
    assert!((31..=33).contains(&peak), "peak at bin {}", peak);
    assert!(bins[peak] > 200);
    assert!(bins[200] < bins[peak]);
}

#[test]
fn test_louder_input_scales_higher() {
    let config = AnalyserConfig {
        smoothing_time_constant: 0.0,
        ..Default::default()
    };
    let mut quiet = FrequencyAnalyser::new(config.clone());
    let mut loud = FrequencyAnalyser::new(config);
    let mut quiet_bins = vec![0u8; 256];
    let mut loud_bins = vec![0u8; 256];

    quiet.byte_frequency_data(&sine(440.0, 44100.0, 0.001, 512), &mut quiet_bins);
    loud.byte_frequency_data(&sine(440.0, 44100.0, 0.8, 512), &mut loud_bins);

    assert!(scale_energies(&loud_bins) > scale_energies(&quiet_bins));
}

#[test]
fn test_smoothing_decays_gradually() {
    let mut analyser = FrequencyAnalyser::new(AnalyserConfig::default());
    let mut bins = vec![0u8; 256];
    let tone = sine(3000.0, 48000.0, 0.5, 512);

    for _ in 0..50 {
        analyser.byte_frequency_data(&tone, &mut bins);
    }
    let settled = bins[32];

    analyser.byte_frequency_data(&[0.0; 512], &mut bins);
    assert!(bins[32] > 0, "smoothing should keep some energy");
    assert!(bins[32] <= settled);

    analyser.reset();
    analyser.byte_frequency_data(&[0.0; 512], &mut bins);
    assert_eq!(bins[32], 0);
}

#[test]
fn test_short_input_is_zero_padded() {
    let mut analyser = FrequencyAnalyser::new(AnalyserConfig::default());
    let mut bins = vec![0u8; 256];

    analyser.byte_frequency_data(&sine(3000.0, 48000.0, 0.5, 100), &mut bins);

    assert!(bins.iter().any(|&b| b > 0));
}

#[test]
fn test_sample_window_keeps_latest() {
    let mut window = SampleWindow::new(3);
    assert!(window.is_empty());

    for sample in [1.0, 2.0, 3.0, 4.0] {
        window.push(sample);
    }

    let mut out = Vec::new();
    window.copy_into(&mut out);
    assert_eq!(window.len(), 3);
    assert_eq!(out, vec![2.0, 3.0, 4.0]);
}
