/// Sample rate the server's STT pipeline expects.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Quantize one float sample in [-1, 1] to signed 16-bit PCM.
///
/// Scaling is symmetric: negatives map onto [-32768, 0), positives onto
/// [0, 32767]. Out-of-range input is clamped first.
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Downsample a block of float samples to `target_rate` by nearest-index
/// decimation and quantize to 16-bit PCM.
///
/// One input sample is picked per scaled output position; there is no
/// lowpass stage, so minor aliasing is accepted.
pub fn downsample_to_pcm16(input: &[f32], input_rate: u32, target_rate: u32) -> Vec<i16> {
    if input.is_empty() || input_rate == 0 || target_rate == 0 {
        return Vec::new();
    }
    if input_rate == target_rate {
        return input.iter().copied().map(quantize).collect();
    }

    let ratio = input_rate as f64 / target_rate as f64;
    let out_len = (input.len() as f64 / ratio).round() as usize;

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src = ((i as f64 * ratio).round() as usize).min(input.len() - 1);
        out.push(quantize(input[src]));
    }
    out
}

/// Serialize samples as little-endian bytes, the layout the wire format and
/// the WAV archive both expect.
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_is_symmetric() {
        assert_eq!(quantize(-1.0), i16::MIN);
        assert_eq!(quantize(1.0), i16::MAX);
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(-0.5), -16384);
    }

    #[test]
    fn quantize_clamps_out_of_range() {
        assert_eq!(quantize(2.5), i16::MAX);
        assert_eq!(quantize(-3.0), i16::MIN);
    }

    #[test]
    fn downsample_halves_length_at_double_rate() {
        let input: Vec<f32> = (0..3200).map(|i| (i % 100) as f32 / 100.0).collect();
        let out = downsample_to_pcm16(&input, 32_000, TARGET_SAMPLE_RATE);
        assert_eq!(out.len(), 1600);
    }

    #[test]
    fn downsample_picks_nearest_input_sample() {
        // At 2:1 decimation output i comes from input 2*i.
        let input = vec![0.0, 0.5, 1.0, -0.5, 0.25, 0.75];
        let out = downsample_to_pcm16(&input, 32_000, 16_000);
        assert_eq!(out, vec![quantize(0.0), quantize(1.0), quantize(0.25)]);
    }

    #[test]
    fn equal_rates_pass_through() {
        let input = vec![0.0, 1.0, -1.0];
        let out = downsample_to_pcm16(&input, 16_000, 16_000);
        assert_eq!(out, vec![0, i16::MAX, i16::MIN]);
    }

    #[test]
    fn empty_input_produces_no_samples() {
        assert!(downsample_to_pcm16(&[], 48_000, 16_000).is_empty());
    }

    #[test]
    fn bytes_are_little_endian() {
        let bytes = pcm16_to_bytes(&[0x0102, -2]);
        assert_eq!(bytes, vec![0x02, 0x01, 0xfe, 0xff]);
    }
}
