use std::path::Path;

use cutout_common::color::threshold_for_tolerance;
use cutout_common::config::{Config, ConfigError, DetectConfig};
use cutout_common::frame::{FrameBuffer, FrameError};
use tracing::{info, warn};

use crate::segment::{detect_key_color, FloodFill, KeyColor, RunReport};

#[derive(Debug, thiserror::Error)]
pub enum CutoutError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub key: KeyColor,
    pub report: RunReport,
}

/// Remove the border-connected background from every frame of `buffer`.
pub fn cutout(buffer: &mut FrameBuffer, tolerance: i32, detect: &DetectConfig) -> RunSummary {
    let threshold = threshold_for_tolerance(tolerance);
    let key = detect_key_color(buffer, detect.coverage_tolerance);

    info!(
        key_color = %key.color,
        votes = key.count,
        samples = key.samples,
        coverage = format!("{:.3}", key.coverage),
        "max color"
    );
    if !key.is_uniform(detect.min_border_coverage) {
        warn!(
            coverage = format!("{:.3}", key.coverage),
            min = detect.min_border_coverage,
            "border is not dominated by one color, background may be left behind"
        );
    }

    let report = FloodFill::new(key.color, threshold).run(buffer);
    RunSummary { key, report }
}

/// Load `input`, cut out the background and write the result to `output`.
///
/// Nothing is written unless the whole input was read and processed.
pub fn run(input: &Path, output: &Path, tolerance: i32, config: &Config) -> Result<RunSummary, CutoutError> {
    let mut buffer = FrameBuffer::load(input, config.input.max_bytes)?;
    info!(
        n = buffer.frames(),
        h = buffer.height(),
        w = buffer.width(),
        "start to cutout img"
    );

    let summary = cutout(&mut buffer, tolerance, &config.detect);
    info!(
        key_color = %summary.key.color,
        frames = summary.report.frames,
        seeds = summary.report.seeds,
        filled = summary.report.filled,
        "cutout done"
    );

    buffer.store(output, config.output.write_header)?;
    info!(
        path = %output.display(),
        bytes = buffer.byte_len(),
        header = config.output.write_header,
        "output written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutout_common::color::Color;
    use std::path::PathBuf;

    const BG: Color = Color::new(10, 10, 10, 255);
    const RED: Color = Color::new(200, 0, 0, 255);

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cutout_pipeline_{}_{name}", std::process::id()))
    }

    fn ring_image() -> FrameBuffer {
        let mut fb = FrameBuffer::filled(1, 4, 4, BG).unwrap();
        for (y, x) in [(1, 1), (1, 2), (2, 1), (2, 2)] {
            fb.set(0, y, x, RED);
        }
        fb
    }

    #[test]
    fn end_to_end_ring() {
        let input = temp_path("ring_in.bin");
        let output = temp_path("ring_out.bin");
        ring_image().store(&input, true).unwrap();

        let summary = run(&input, &output, 0, &Config::default()).unwrap();
        let result = FrameBuffer::load(&output, u64::MAX).unwrap();
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();

        assert_eq!(summary.key.color, BG);
        assert_eq!(summary.report.filled, 12);
        for y in 0..4 {
            for x in 0..4 {
                let interior = (1..=2).contains(&y) && (1..=2).contains(&x);
                let expected = if interior { RED } else { Color::TRANSPARENT };
                assert_eq!(result.get(0, y, x), expected);
            }
        }
    }

    #[test]
    fn rerun_on_output_is_idempotent() {
        let mut fb = ring_image();
        fb.set(0, 0, 3, Color::new(12, 9, 10, 255));
        let detect = DetectConfig::default();

        cutout(&mut fb, 3, &detect);
        let once = fb.clone();
        let second = cutout(&mut fb, 3, &detect);
        assert_eq!(fb, once);
        assert_eq!(second.report.filled, 0);
    }

    #[test]
    fn headerless_output() {
        let input = temp_path("raw_in.bin");
        let output = temp_path("raw_out.bin");
        ring_image().store(&input, true).unwrap();

        let mut config = Config::default();
        config.output.write_header = false;
        run(&input, &output, 0, &config).unwrap();
        let bytes = std::fs::read(&output).unwrap();
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();

        assert_eq!(bytes.len(), 16 * 4);
        assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
        // (1, 1) is the first interior pixel.
        assert_eq!(&bytes[5 * 4..6 * 4], &[200, 0, 0, 255]);
    }

    #[test]
    fn missing_input_writes_nothing() {
        let input = temp_path("missing_in.bin");
        let output = temp_path("missing_out.bin");
        std::fs::remove_file(&output).ok();

        let result = run(&input, &output, 0, &Config::default());
        assert!(matches!(result, Err(CutoutError::Frame(FrameError::Open { .. }))));
        assert!(!output.exists());
    }

    #[test]
    fn oversized_input_writes_nothing() {
        let input = temp_path("big_in.bin");
        let output = temp_path("big_out.bin");
        std::fs::remove_file(&output).ok();
        let mut header = Vec::new();
        for dim in [1000i32, 1000, 1000] {
            header.extend_from_slice(&dim.to_le_bytes());
        }
        std::fs::write(&input, header).unwrap();

        let result = run(&input, &output, 0, &Config::default());
        std::fs::remove_file(&input).ok();
        assert!(matches!(
            result,
            Err(CutoutError::Frame(FrameError::Oversized { .. }))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn truncated_input_writes_nothing() {
        let input = temp_path("short_in.bin");
        let output = temp_path("short_out.bin");
        std::fs::remove_file(&output).ok();
        let mut bytes = Vec::new();
        ring_image().write_to(&mut bytes, true).unwrap();
        bytes.truncate(bytes.len() - 6);
        std::fs::write(&input, bytes).unwrap();

        let result = run(&input, &output, 0, &Config::default());
        std::fs::remove_file(&input).ok();
        assert!(matches!(
            result,
            Err(CutoutError::Frame(FrameError::Truncated { expected: 16, got: 14 }))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn unwritable_output() {
        let input = temp_path("unwritable_in.bin");
        ring_image().store(&input, true).unwrap();
        let output = temp_path("no_such_dir").join("out.bin");

        let result = run(&input, &output, 0, &Config::default());
        std::fs::remove_file(&input).ok();
        assert!(matches!(result, Err(CutoutError::Frame(FrameError::Create { .. }))));
    }

    #[test]
    fn mixed_border_still_processed() {
        // Half the border is red: coverage is low, the fill still runs.
        let mut fb = FrameBuffer::filled(1, 4, 4, BG).unwrap();
        for y in 0..4 {
            fb.set(0, y, 2, RED);
            fb.set(0, y, 3, RED);
        }
        let summary = cutout(&mut fb, 0, &DetectConfig::default());
        assert!(summary.key.coverage < 0.6);
        assert!(summary.report.filled > 0);
    }
}
