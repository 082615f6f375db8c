use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::PcmBuffer;

/// Writes mono 16-bit PCM, the format the encoder's concat demuxer expects
/// from every segment.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()
}

/// Reads a WAV file into normalised `f32` samples. Multi-channel input keeps
/// only the first channel.
pub fn read_wav(path: &Path) -> Result<PcmBuffer, hound::Error> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved.into_iter().step_by(channels).collect()
    };
    Ok(PcmBuffer::new(samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_segments_keep_their_length() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("segment.wav");
        let samples: Vec<f32> = (0..2_400).map(|i| ((i as f32) / 100.0).sin() * 0.5).collect();
        write_wav(&path, &samples, 24_000).unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.sample_rate, 24_000);
        assert_eq!(buffer.samples.len(), samples.len());
        assert!((buffer.samples[157] - samples[157]).abs() < 1e-3);
    }

    #[test]
    fn reads_float_stereo_first_channel() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22_050,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for (left, right) in [(0.25_f32, -1.0_f32), (0.5, -1.0), (0.75, -1.0)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.samples, vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn rejects_non_wav_files() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.wav");
        std::fs::write(&path, b"not a wav").unwrap();
        assert!(read_wav(&path).is_err());
    }
}
