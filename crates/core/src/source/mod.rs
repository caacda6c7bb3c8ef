use std::{
    fs::File,
    io::{BufReader, Cursor, Read},
    time::Duration,
};

use crate::{BenchError, Result};

/// Mono samples with the rate they were recorded at.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Anything that can turn a locator into audio samples.
pub trait AudioSource {
    fn fetch_signal(&self, locator: &str) -> Result<DecodedAudio>;
}

/// WAV files from disk or over HTTP(S).
#[derive(Debug, Clone)]
pub struct WavSource {
    agent: ureq::Agent,
}

impl Default for WavSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WavSource {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self { agent }
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| BenchError::source_unavailable(url, err))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|err| BenchError::source_unavailable(url, err))?;
        tracing::debug!(url, bytes = bytes.len(), "downloaded audio");
        Ok(bytes)
    }
}

impl AudioSource for WavSource {
    fn fetch_signal(&self, locator: &str) -> Result<DecodedAudio> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            let bytes = self.download(locator)?;
            decode_wav(Cursor::new(bytes), locator)
        } else {
            let file = File::open(locator).map_err(|err| BenchError::source_unavailable(locator, err))?;
            decode_wav(BufReader::new(file), locator)
        }
    }
}

/// Decodes a WAV stream to mono `f32`, averaging channels.
pub fn decode_wav<R: Read>(reader: R, locator: &str) -> Result<DecodedAudio> {
    let unavailable = |err: hound::Error| BenchError::source_unavailable(locator, err);
    let reader = hound::WavReader::new(reader).map_err(unavailable)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(unavailable)?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(unavailable)?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let samples = if channels > 1 {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        interleaved
    };

    tracing::info!(
        locator,
        sample_rate = spec.sample_rate,
        channels,
        samples = samples.len(),
        "decoded audio"
    );
    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    use super::*;

    fn write_wav<S: hound::Sample + Copy>(path: &Path, spec: WavSpec, samples: &[S]) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        for sample in samples {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_int_pcm_to_unit_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("int.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, &[0_i16, 16_384, -32_768]);

        let audio = WavSource::new().fetch_signal(path.to_str().unwrap()).unwrap();

        assert_eq!(audio.sample_rate, 16_000);
        assert_eq!(audio.samples, vec![0.0, 0.5, -1.0]);
    }

    #[test]
    fn mixes_float_stereo_to_mono() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        write_wav(&path, spec, &[1.0_f32, 0.0, 0.5, 0.5]);

        let audio = WavSource::new().fetch_signal(path.to_str().unwrap()).unwrap();

        assert_eq!(audio.samples, vec![0.5, 0.5]);
        assert_eq!(audio.sample_rate, 8_000);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let err = WavSource::new()
            .fetch_signal("/definitely/not/here.wav")
            .unwrap_err();
        assert!(matches!(err, BenchError::SourceUnavailable { ref locator, .. } if locator == "/definitely/not/here.wav"));
    }

    #[test]
    fn garbage_bytes_are_source_unavailable() {
        let err = decode_wav(Cursor::new(b"not a wav file".to_vec()), "memory").unwrap_err();
        assert!(matches!(err, BenchError::SourceUnavailable { .. }));
    }
}
