//! Uniform invocation over feature extractors with incompatible signatures.
//!
//! A [`LibraryAdapter`] pairs a display name with two functions: one that maps
//! the canonical `(signal, hop_duration, fft_size)` triple plus the shared
//! [`Calibration`] onto the library's own argument type, and one that runs
//! the library on those arguments. The argument type differs per library, so
//! the registry stores adapters behind the object-safe [`Library`] trait.

use std::{collections::HashSet, fmt, sync::Arc};

use ndarray::Array2;

use crate::{BenchError, Calibration, Result};

/// Feature output of one library call, `(frames, coefficients)` or its
/// transpose.
pub type FeatureMatrix = Array2<f32>;

/// Mono samples shared between the harness and prepared calls.
pub type Signal = Arc<[f32]>;

/// Outcome of a compute call. Library errors stay opaque to the harness.
pub type ComputeResult = anyhow::Result<FeatureMatrix>;

type ArgsFn<A> = dyn Fn(&Signal, f32, usize, &Calibration) -> A;
type ComputeFn<A> = dyn Fn(&A) -> ComputeResult;
type ProbeFn = dyn Fn(&Calibration) -> anyhow::Result<()>;

/// A library's compute function bound to its argument mapping.
pub struct LibraryAdapter<A> {
    name: String,
    to_native_args: Box<ArgsFn<A>>,
    compute: Box<ComputeFn<A>>,
    probe: Option<Box<ProbeFn>>,
}

impl<A> LibraryAdapter<A> {
    pub fn new(
        name: impl Into<String>,
        to_native_args: impl Fn(&Signal, f32, usize, &Calibration) -> A + 'static,
        compute: impl Fn(&A) -> ComputeResult + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            to_native_args: Box::new(to_native_args),
            compute: Box::new(compute),
            probe: None,
        }
    }

    /// Attaches a check run once when the registry is built. A failing probe
    /// marks the library as unavailable and aborts registry construction.
    pub fn with_probe(mut self, probe: impl Fn(&Calibration) -> anyhow::Result<()> + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }
}

impl<A> fmt::Debug for LibraryAdapter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryAdapter")
            .field("name", &self.name)
            .field("probe", &self.probe.is_some())
            .finish()
    }
}

/// Object-safe view of an adapter whose argument type has been erased.
pub trait Library {
    fn name(&self) -> &str;

    /// Confirms the library can run under `calibration`.
    fn check_available(&self, calibration: &Calibration) -> anyhow::Result<()>;

    /// Builds native arguments once and returns a call that can be repeated
    /// without rebuilding them.
    fn prepare(
        &self,
        signal: &Signal,
        hop_duration: f32,
        fft_size: usize,
        calibration: &Calibration,
    ) -> PreparedCall<'_>;
}

impl<A: 'static> Library for LibraryAdapter<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_available(&self, calibration: &Calibration) -> anyhow::Result<()> {
        match &self.probe {
            Some(probe) => probe(calibration),
            None => Ok(()),
        }
    }

    fn prepare(
        &self,
        signal: &Signal,
        hop_duration: f32,
        fft_size: usize,
        calibration: &Calibration,
    ) -> PreparedCall<'_> {
        let args = (self.to_native_args)(signal, hop_duration, fft_size, calibration);
        let compute = &self.compute;
        PreparedCall {
            call: Box::new(move || compute(&args)),
        }
    }
}

/// Native arguments already bound to a compute function.
pub struct PreparedCall<'a> {
    call: Box<dyn Fn() -> ComputeResult + 'a>,
}

impl PreparedCall<'_> {
    pub fn invoke(&self) -> ComputeResult {
        (self.call)()
    }
}

impl fmt::Debug for PreparedCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedCall").finish_non_exhaustive()
    }
}

/// Ordered, read-only set of libraries sharing one calibration.
pub struct LibraryRegistry {
    calibration: Calibration,
    libraries: Vec<Box<dyn Library>>,
}

impl LibraryRegistry {
    pub fn builder(calibration: Calibration) -> RegistryBuilder {
        RegistryBuilder {
            calibration,
            libraries: Vec::new(),
        }
    }

    /// Validates the calibration and every library before anything is timed.
    pub fn new(calibration: Calibration, libraries: Vec<Box<dyn Library>>) -> Result<Self> {
        calibration.validate()?;
        if libraries.is_empty() {
            return Err(BenchError::configuration("no libraries registered"));
        }

        {
            let mut seen = HashSet::new();
            for library in &libraries {
                if !seen.insert(library.name()) {
                    return Err(BenchError::configuration(format!(
                        "library `{}` registered twice",
                        library.name()
                    )));
                }
                library.check_available(&calibration).map_err(|err| {
                    BenchError::configuration(format!(
                        "library `{}` is unavailable: {err:#}",
                        library.name()
                    ))
                })?;
            }
        }

        tracing::debug!(count = libraries.len(), "library registry ready");
        Ok(Self {
            calibration,
            libraries,
        })
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Library> {
        self.libraries.iter().map(|library| library.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.libraries.iter().map(|library| library.name())
    }
}

impl fmt::Debug for LibraryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryRegistry")
            .field("calibration", &self.calibration)
            .field("libraries", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Collects adapters in display order.
pub struct RegistryBuilder {
    calibration: Calibration,
    libraries: Vec<Box<dyn Library>>,
}

impl RegistryBuilder {
    pub fn register<A: 'static>(mut self, adapter: LibraryAdapter<A>) -> Self {
        self.libraries.push(Box::new(adapter));
        self
    }

    pub fn build(self) -> Result<LibraryRegistry> {
        LibraryRegistry::new(self.calibration, self.libraries)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;

    fn adapter(name: &str) -> LibraryAdapter<usize> {
        LibraryAdapter::new(
            name,
            |signal: &Signal, _, _, calibration: &Calibration| signal.len() + calibration.coefficient_count,
            |len: &usize| Ok(Array2::zeros((*len, 1))),
        )
    }

    fn signal(len: usize) -> Signal {
        vec![0.0; len].into()
    }

    #[test]
    fn keeps_registration_order() {
        let registry = LibraryRegistry::builder(Calibration::default())
            .register(adapter("b"))
            .register(adapter("a"))
            .register(adapter("c"))
            .build()
            .unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn prepared_call_reuses_arguments() {
        let built = Rc::new(Cell::new(0));
        let counter = built.clone();
        let library = LibraryAdapter::new(
            "counting",
            move |signal: &Signal, _, _, _: &Calibration| {
                counter.set(counter.get() + 1);
                signal.len()
            },
            |len: &usize| Ok(Array2::zeros((*len, 2))),
        );

        let call = library.prepare(&signal(4), 0.01, 512, &Calibration::default());
        for _ in 0..3 {
            assert_eq!(call.invoke().unwrap().dim(), (4, 2));
        }
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn arguments_see_the_shared_calibration() {
        let calibration = Calibration {
            coefficient_count: 7,
            ..Calibration::default()
        };
        let library = adapter("a");
        let out = library.prepare(&signal(3), 0.01, 512, &calibration).invoke().unwrap();
        assert_eq!(out.nrows(), 10);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = LibraryRegistry::builder(Calibration::default())
            .register(adapter("same"))
            .register(adapter("same"))
            .build()
            .unwrap_err();
        assert!(format!("{err}").contains("registered twice"));
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert!(LibraryRegistry::builder(Calibration::default()).build().is_err());
    }

    #[test]
    fn failing_probe_is_a_configuration_error() {
        let err = LibraryRegistry::builder(Calibration::default())
            .register(adapter("fine"))
            .register(adapter("missing").with_probe(|_| Err(anyhow::anyhow!("backend not compiled in"))))
            .build()
            .unwrap_err();
        match err {
            BenchError::Configuration { reason } => {
                assert!(reason.contains("missing"));
                assert!(reason.contains("backend not compiled in"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_calibration_is_rejected_before_probes() {
        let probed = Rc::new(Cell::new(false));
        let flag = probed.clone();
        let calibration = Calibration {
            filter_count: 0,
            ..Calibration::default()
        };
        let result = LibraryRegistry::builder(calibration)
            .register(adapter("a").with_probe(move |_| {
                flag.set(true);
                Ok(())
            }))
            .build();
        assert!(result.is_err());
        assert!(!probed.get());
    }
}
