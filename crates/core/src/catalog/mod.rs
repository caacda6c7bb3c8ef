use serde::{Deserialize, Serialize};

use crate::{BenchError, Result};

/// Labels run out after `Z`.
pub const MAX_PARAMETER_SETS: usize = 26;

/// One synthetic workload. `loop_count` repeats the compute call to lift the
/// measurement above timer noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Signal length in samples.
    pub audio_length: usize,
    /// Frame stride and window, in seconds.
    pub hop_duration: f32,
    pub fft_size: usize,
    pub loop_count: u32,
}

impl ParameterSet {
    pub const fn new(audio_length: usize, hop_duration: f32, fft_size: usize, loop_count: u32) -> Self {
        Self {
            audio_length,
            hop_duration,
            fft_size,
            loop_count,
        }
    }

    fn validate(&self, label: char) -> Result<()> {
        if self.audio_length == 0 {
            return Err(BenchError::configuration(format!(
                "parameter set {label} has an empty signal"
            )));
        }
        if !(self.hop_duration > 0.0) {
            return Err(BenchError::configuration(format!(
                "parameter set {label} needs a positive hop duration"
            )));
        }
        if self.fft_size == 0 || self.loop_count == 0 {
            return Err(BenchError::configuration(format!(
                "parameter set {label} needs a non-zero fft size and loop count"
            )));
        }
        Ok(())
    }
}

/// Immutable, ordered list of workloads. Position determines the label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterCatalog {
    sets: Vec<ParameterSet>,
}

impl ParameterCatalog {
    pub fn new(sets: Vec<ParameterSet>) -> Result<Self> {
        if sets.is_empty() {
            return Err(BenchError::configuration("parameter catalog is empty"));
        }
        if sets.len() > MAX_PARAMETER_SETS {
            return Err(BenchError::configuration(format!(
                "parameter catalog holds {} sets, labels only reach {MAX_PARAMETER_SETS}",
                sets.len()
            )));
        }
        for (index, set) in sets.iter().enumerate() {
            set.validate(label(index))?;
        }
        Ok(Self { sets })
    }

    /// The four workloads of the reference comparison at `sample_rate`.
    pub fn standard(sample_rate: u32) -> Self {
        let second = sample_rate as usize;
        Self {
            sets: vec![
                ParameterSet::new(30 * second, 0.01, 2048, 20),
                ParameterSet::new(15 * second, 0.05, 2048, 200),
                ParameterSet::new(second, 0.1, 2048, 2000),
                ParameterSet::new(second, 0.1, 512, 20000),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ParameterSet> {
        self.sets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSet> {
        self.sets.iter()
    }

    /// `(label, set)` pairs in catalog order.
    pub fn labelled(&self) -> impl Iterator<Item = (char, &ParameterSet)> {
        self.sets.iter().enumerate().map(|(i, set)| (label(i), set))
    }

    pub fn labels(&self) -> impl Iterator<Item = char> + '_ {
        (0..self.sets.len()).map(label)
    }
}

/// `A` for the first parameter set, `B` for the second, and so on.
pub fn label(index: usize) -> char {
    (b'A' + (index % MAX_PARAMETER_SETS) as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_matches_reference_workloads() {
        let catalog = ParameterCatalog::standard(16_000);
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get(0), Some(&ParameterSet::new(480_000, 0.01, 2048, 20)));
        assert_eq!(catalog.get(3).map(|p| p.loop_count), Some(20_000));
        assert_eq!(catalog.labels().collect::<String>(), "ABCD");
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(
            ParameterCatalog::new(vec![]),
            Err(BenchError::Configuration { .. })
        ));
    }

    #[test]
    fn rejects_zero_loops_and_names_the_label() {
        let err = ParameterCatalog::new(vec![
            ParameterSet::new(100, 0.01, 64, 1),
            ParameterSet::new(100, 0.01, 64, 0),
        ])
        .unwrap_err();
        assert!(format!("{err}").contains("parameter set B"));
    }

    #[test]
    fn rejects_nan_hop() {
        assert!(ParameterCatalog::new(vec![ParameterSet::new(100, f32::NAN, 64, 1)]).is_err());
    }

    #[test]
    fn rejects_more_sets_than_labels() {
        let sets = vec![ParameterSet::new(10, 0.01, 8, 1); MAX_PARAMETER_SETS + 1];
        assert!(ParameterCatalog::new(sets).is_err());
    }
}
