use crate::config::Config;
use crate::error::GnssrError;
use crate::retrieval::lombscargle;
use crate::retrieval::structs::HeightRetrieval;
use indexmap::IndexMap;
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
use pyo3::prelude::*;
use std::path::PathBuf;

fn retrieval_to_dict(py: Python<'_>, r: HeightRetrieval) -> IndexMap<String, PyObject> {
    let mut rec = IndexMap::new();
    rec.insert("prn".to_string(), r.prn.into_py(py));
    rec.insert("timestamp".to_string(), r.timestamp.to_rfc3339().into_py(py));
    rec.insert("reflector_height".to_string(), r.reflector_height.into_py(py));
    rec.insert("peak_amplitude".to_string(), r.peak_amplitude.into_py(py));
    rec.insert("peak_to_noise".to_string(), r.peak_to_noise.into_py(py));
    rec.insert("azimuth".to_string(), r.azimuth.into_py(py));
    rec.insert("min_elevation".to_string(), r.min_elevation.into_py(py));
    rec.insert("max_elevation".to_string(), r.max_elevation.into_py(py));
    rec.insert("point_count".to_string(), r.point_count.into_py(py));
    rec.insert(
        "frequencies".to_string(),
        r.spectrum.frequencies.into_pyarray_bound(py).into_py(py),
    );
    rec.insert(
        "amplitudes".to_string(),
        r.spectrum.amplitudes.into_pyarray_bound(py).into_py(py),
    );
    rec
}

/// Retrieves reflector heights from a receiver log, optionally with an INI configuration.
#[pyfunction]
#[pyo3(name = "process_log")]
#[pyo3(signature = (path, config_path = None))]
#[pyo3(text_signature = "(path: str, config_path: str | None = None, /)")]
fn process_log_py(
    py: Python<'_>,
    path: PathBuf,
    config_path: Option<PathBuf>,
) -> PyResult<Vec<IndexMap<String, PyObject>>> {
    let config = match config_path {
        Some(p) => Config::from_ini_file(&p).map_err(GnssrError::from)?,
        None => Config::default(),
    };
    let retrievals = py.allow_threads(|| crate::process_log_file(&path, &config))?;
    Ok(retrievals
        .into_iter()
        .map(|r| retrieval_to_dict(py, r))
        .collect())
}

/// Lomb-Scargle amplitude periodogram: `(frequencies, amplitudes, false_alarm, confidence95)`.
#[pyfunction]
#[pyo3(name = "periodogram")]
#[pyo3(text_signature = "(x: np.ndarray, y: np.ndarray, ofac: float, hifac: float, /)")]
fn periodogram_py<'py>(
    py: Python<'py>,
    x: PyReadonlyArray1<'py, f64>,
    y: PyReadonlyArray1<'py, f64>,
    ofac: f64,
    hifac: f64,
) -> PyResult<(
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    f64,
)> {
    let p = lombscargle::periodogram(x.as_slice()?, y.as_slice()?, ofac, hifac)?;
    Ok((
        p.frequencies.into_pyarray_bound(py),
        p.amplitudes.into_pyarray_bound(py),
        p.false_alarm.into_pyarray_bound(py),
        p.confidence95,
    ))
}

/// Reflector height retrieval from GNSS receiver logs.
#[pymodule]
fn gnssr(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(process_log_py, m)?)?;
    m.add_function(wrap_pyfunction!(periodogram_py, m)?)?;

    Ok(())
}
