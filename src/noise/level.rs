/// Noise reading on the relative 0-100 scale
pub type NoiseLevel = u8;

/// Upper bound of a noise reading
pub const MAX_LEVEL: NoiseLevel = 100;

/// Reduce a frequency energy snapshot (0-255 per bin) to a noise level
///
/// Mean bin energy is doubled relative to full scale, so a signal using half
/// of the byte range already reads 100. Empty input reads 0.
pub fn scale_energies(bins: &[u8]) -> NoiseLevel {
    if bins.is_empty() {
        return 0;
    }

    let sum: u64 = bins.iter().map(|&b| b as u64).sum();
    let mean = sum as f64 / bins.len() as f64;
    let scaled = ((mean / 255.0) * 200.0).floor();

    scaled.min(MAX_LEVEL as f64) as NoiseLevel
}
