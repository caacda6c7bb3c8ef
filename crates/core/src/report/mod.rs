use std::fmt::{self, Write as _};

use crate::{catalog::ParameterCatalog, runner::Timings, BenchError, Calibration, Result};

/// Column names of the parameter table.
pub const PARAMETER_COLUMNS: [&str; 9] = [
    "label",
    "audio_length",
    "hop_duration_stride",
    "hop_duration_window",
    "fft_size",
    "sample_rate",
    "coefficient_count",
    "filter_count",
    "loop_count",
];

/// Tab-delimited benchmark tables, one line per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub library_table: String,
    pub parameter_table: String,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.library_table)?;
        write!(f, "{}", self.parameter_table)
    }
}

/// Renders `timings` against `catalog`. Every library must carry exactly one
/// sample per parameter set, in catalog order.
pub fn format(catalog: &ParameterCatalog, calibration: &Calibration, timings: &Timings) -> Result<Report> {
    Ok(Report {
        library_table: library_table(catalog, timings)?,
        parameter_table: parameter_table(catalog, calibration),
    })
}

fn library_table(catalog: &ParameterCatalog, timings: &Timings) -> Result<String> {
    let mut out = String::new();
    let header: Vec<String> = catalog.labels().map(String::from).collect();
    push_row(&mut out, std::iter::once(String::new()).chain(header));

    for entry in timings.iter() {
        if entry.samples.len() != catalog.len() {
            return Err(BenchError::Report(format!(
                "library `{}` has {} timings for {} parameter sets",
                entry.name,
                entry.samples.len(),
                catalog.len()
            )));
        }
        if let Some((position, sample)) = entry
            .samples
            .iter()
            .enumerate()
            .find(|(position, sample)| sample.parameter_set_index != *position)
        {
            return Err(BenchError::Report(format!(
                "library `{}` timing {position} belongs to parameter set {}",
                entry.name,
                sample.label()
            )));
        }

        let cells = entry
            .samples
            .iter()
            .map(|sample| format!("{:.6}", sample.elapsed_seconds()));
        push_row(&mut out, std::iter::once(entry.name.clone()).chain(cells));
    }
    Ok(out)
}

fn parameter_table(catalog: &ParameterCatalog, calibration: &Calibration) -> String {
    let mut out = String::new();
    push_row(&mut out, PARAMETER_COLUMNS.iter().map(|name| name.to_string()));
    for (label, set) in catalog.labelled() {
        push_row(
            &mut out,
            [
                label.to_string(),
                set.audio_length.to_string(),
                set.hop_duration.to_string(),
                set.hop_duration.to_string(),
                set.fft_size.to_string(),
                calibration.sample_rate.to_string(),
                calibration.coefficient_count.to_string(),
                calibration.filter_count.to_string(),
                set.loop_count.to_string(),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, cells: impl IntoIterator<Item = String>) {
    let row = cells.into_iter().collect::<Vec<_>>().join("\t");
    let _ = writeln!(out, "{row}");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{catalog::ParameterSet, runner::TimingSample};

    fn catalog() -> ParameterCatalog {
        ParameterCatalog::new(vec![
            ParameterSet::new(480_000, 0.01, 2048, 20),
            ParameterSet::new(16_000, 0.1, 512, 20_000),
            ParameterSet::new(16_000, 0.05, 1024, 3),
        ])
        .unwrap()
    }

    fn timings(names: &[&str], sets: usize) -> Timings {
        let mut timings = Timings::new();
        for index in 0..sets {
            for (offset, name) in names.iter().enumerate() {
                timings.push(TimingSample {
                    library_name: name.to_string(),
                    parameter_set_index: index,
                    elapsed: Duration::from_millis((index * 10 + offset) as u64 + 1),
                });
            }
        }
        timings
    }

    #[test]
    fn library_table_has_one_row_per_library_and_column_per_set() {
        let report = format(&catalog(), &Calibration::default(), &timings(&["x", "y"], 3)).unwrap();
        let rows: Vec<&str> = report.library_table.lines().collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "\tA\tB\tC");
        assert!(rows.iter().all(|row| row.split('\t').count() == 4));
        assert_eq!(rows[1], "x\t0.001000\t0.011000\t0.021000");
        assert!(rows[2].starts_with("y\t"));
    }

    #[test]
    fn parameter_table_surfaces_calibration() {
        let report = format(&catalog(), &Calibration::default(), &timings(&["x"], 3)).unwrap();
        let rows: Vec<&str> = report.parameter_table.lines().collect();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].split('\t').collect::<Vec<_>>(), PARAMETER_COLUMNS);
        assert_eq!(rows[1], "A\t480000\t0.01\t0.01\t2048\t16000\t13\t20\t20");
        assert!(rows.iter().all(|row| row.split('\t').count() == PARAMETER_COLUMNS.len()));
    }

    #[test]
    fn formatting_is_deterministic_and_pure() {
        let catalog = catalog();
        let timings = timings(&["b", "a", "c"], 3);
        let before = timings.clone();

        let first = format(&catalog, &Calibration::default(), &timings).unwrap();
        let second = format(&catalog, &Calibration::default(), &timings).unwrap();

        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(timings, before);
    }

    #[test]
    fn ragged_timings_are_rejected() {
        let err = format(&catalog(), &Calibration::default(), &timings(&["x"], 2)).unwrap_err();
        assert!(matches!(err, BenchError::Report(_)));
    }

    #[test]
    fn display_separates_tables_with_a_blank_line() {
        let report = format(&catalog(), &Calibration::default(), &timings(&["x"], 3)).unwrap();
        assert!(report.to_string().contains("\n\nlabel\t"));
    }
}
