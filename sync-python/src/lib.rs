//! # sync-python
//!
//! Python bindings for Tether via PyO3.
//!
//! Wraps [`sync_bridge::SessionBridge`] into a Python class. Handles cross
//! as plain integers; bind, refresh and graceful unbind return coroutines
//! (awaitable from asyncio).

#![warn(clippy::all)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyValueError};
use pyo3::prelude::*;
use tracing_subscriber::EnvFilter;

use sync_bridge::{BridgeConfig, BridgeError, MetricsSnapshot, Operation, SessionBridge};
use sync_core::SessionEvent;
use sync_engine::{ClientRegistry, MockEngine, SessionObserver};
use sync_types::{ErrorKind, SessionHandle};

// ============================================================
// Exceptions: one class per ErrorKind, rooted at SessionError
// ============================================================

create_exception!(_tether, SessionError, PyException);
create_exception!(_tether, InvalidHandleError, SessionError);
create_exception!(_tether, MarshalingError, SessionError);
create_exception!(_tether, EngineRejectedError, SessionError);
create_exception!(_tether, InvalidStateError, SessionError);
create_exception!(_tether, CapacityError, SessionError);
create_exception!(_tether, InternalError, SessionError);

fn to_py_err(err: BridgeError) -> PyErr {
    let message = err.to_string();
    match err.kind() {
        ErrorKind::InvalidHandle => InvalidHandleError::new_err(message),
        ErrorKind::Marshaling => MarshalingError::new_err(message),
        ErrorKind::EngineRejected => EngineRejectedError::new_err(message),
        ErrorKind::InvalidState => InvalidStateError::new_err(message),
        ErrorKind::CapacityExhausted => CapacityError::new_err(message),
        ErrorKind::Internal => InternalError::new_err(message),
    }
}

/// Python class name raised for each error kind.
fn exception_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidHandle => "InvalidHandleError",
        ErrorKind::Marshaling => "MarshalingError",
        ErrorKind::EngineRejected => "EngineRejectedError",
        ErrorKind::InvalidState => "InvalidStateError",
        ErrorKind::CapacityExhausted => "CapacityError",
        ErrorKind::Internal => "InternalError",
    }
}

// ============================================================
// Observer: forwards events to a Python object
// ============================================================

/// Calls `on_session_event(kind, detail)` on a Python object.
struct PyObserver {
    target: Py<PyAny>,
}

impl SessionObserver for PyObserver {
    fn on_event(&self, event: &SessionEvent) {
        Python::attach(|py| {
            let (kind, detail) = event_args(event);
            if let Err(err) = self
                .target
                .call_method1(py, "on_session_event", (kind, detail))
            {
                tracing::warn!(event = kind, "Python observer raised: {}", err);
            }
        });
    }
}

fn event_args(event: &SessionEvent) -> (&'static str, Option<String>) {
    (event.kind(), event.detail().map(str::to_string))
}

// ============================================================
// FFI types: #[pyclass(frozen)] for immutable Python objects
// ============================================================

/// Snapshot of one live session.
#[pyclass(frozen, name = "SessionInfo")]
pub struct PySessionInfo {
    /// Raw handle value.
    #[pyo3(get)]
    handle: u64,
    /// Local data file path.
    #[pyo3(get)]
    local_path: String,
    /// Lifecycle state name.
    #[pyo3(get)]
    state: String,
    /// Highest commit version notified while bound.
    #[pyo3(get)]
    last_version: Option<u64>,
}

#[pymethods]
impl PySessionInfo {
    fn __repr__(&self) -> String {
        format!(
            "SessionInfo(handle={}, local_path='{}', state='{}', last_version={:?})",
            self.handle, self.local_path, self.state, self.last_version
        )
    }
}

fn bridge_info_to_py(info: sync_bridge::SessionInfo) -> PySessionInfo {
    PySessionInfo {
        handle: info.handle,
        local_path: info.local_path,
        state: info.state.to_string(),
        last_version: info.last_version,
    }
}

fn metrics_entries(snapshot: &MetricsSnapshot) -> HashMap<&'static str, u64> {
    HashMap::from([
        ("sessions_live", snapshot.sessions_live),
        ("sessions_created", snapshot.sessions_created),
        ("sessions_released", snapshot.sessions_released),
        ("binds", snapshot.binds),
        ("refreshes", snapshot.refreshes),
        ("commits_forwarded", snapshot.commits_forwarded),
        ("stale_handle_rejections", snapshot.stale_handle_rejections),
        ("boundary_errors", snapshot.boundary_errors),
        ("panics_caught", snapshot.panics_caught),
    ])
}

// ============================================================
// SessionBridge: the main pyclass
//
// Uses Arc<SessionBridge> so async closures can share ownership.
// ============================================================

/// Handle-based session bridge for Python.
///
/// Create sessions with `create_session`, then pass the returned integer
/// handle to every other method. A handle of 0 means the client was unknown.
///
/// Supports async context manager; exit force-unbinds every live session.
#[pyclass(frozen, name = "SessionBridge")]
pub struct PySessionBridge {
    inner: Arc<SessionBridge>,
}

impl PySessionBridge {
    fn handle(&self, operation: Operation, raw: u64) -> PyResult<SessionHandle> {
        self.inner
            .handle_from_raw(operation, raw)
            .map_err(to_py_err)
    }
}

#[pymethods]
impl PySessionBridge {
    /// Create a bridge, optionally loading a TOML config file.
    #[new]
    #[pyo3(signature = (config_path=None))]
    fn new(config_path: Option<PathBuf>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => BridgeConfig::from_file(&path)
                .map_err(|e| PyValueError::new_err(e.to_string()))?,
            None => BridgeConfig::default(),
        };
        let registry = Arc::new(ClientRegistry::new());
        Ok(Self {
            inner: Arc::new(SessionBridge::new(config, registry)),
        })
    }

    /// Log filter from the bridge configuration.
    #[getter]
    fn logging_filter(&self) -> String {
        self.inner.config().logging.filter.clone()
    }

    /// Register an in-process mock engine client and return its handle.
    fn register_mock_client(&self) -> u64 {
        self.inner
            .clients()
            .register(Arc::new(MockEngine::new()))
            .to_raw()
    }

    /// Open a session for `local_path`. Returns 0 when `client` is unknown.
    #[pyo3(signature = (client, local_path, observer=None))]
    fn create_session(
        &self,
        client: u64,
        local_path: String,
        observer: Option<Py<PyAny>>,
    ) -> PyResult<u64> {
        let observer =
            observer.map(|target| Arc::new(PyObserver { target }) as Arc<dyn SessionObserver>);
        let handle = self
            .inner
            .create(client, &local_path, observer)
            .map_err(to_py_err)?;
        Ok(handle.map_or(SessionHandle::NULL_RAW, |h| h.to_raw()))
    }

    /// Attach a session to a remote endpoint.
    fn bind<'py>(
        &self,
        py: Python<'py>,
        handle: u64,
        remote_url: String,
        access_token: String,
    ) -> PyResult<Bound<'py, PyAny>> {
        let handle = self.handle(Operation::Bind, handle)?;
        let bridge = Arc::clone(&self.inner);
        pyo3_async_runtimes::tokio::future_into_py(py, async move {
            bridge
                .bind(handle, &remote_url, &access_token)
                .await
                .map_err(to_py_err)
        })
    }

    /// Replace the credential of a bound session.
    fn refresh<'py>(
        &self,
        py: Python<'py>,
        handle: u64,
        access_token: String,
    ) -> PyResult<Bound<'py, PyAny>> {
        let handle = self.handle(Operation::Refresh, handle)?;
        let bridge = Arc::clone(&self.inner);
        pyo3_async_runtimes::tokio::future_into_py(py, async move {
            bridge
                .refresh(handle, &access_token)
                .await
                .map_err(to_py_err)
        })
    }

    /// Signal stop, wait for in-flight calls, then release.
    fn unbind_graceful<'py>(&self, py: Python<'py>, handle: u64) -> PyResult<Bound<'py, PyAny>> {
        let handle = self.handle(Operation::Unbind, handle)?;
        let bridge = Arc::clone(&self.inner);
        pyo3_async_runtimes::tokio::future_into_py(py, async move {
            bridge.unbind_graceful(handle).await.map_err(to_py_err)
        })
    }

    /// Release a session at once and abort its engine session.
    fn unbind(&self, handle: u64) -> PyResult<()> {
        let handle = self.handle(Operation::Unbind, handle)?;
        self.inner.unbind(handle).map_err(to_py_err)
    }

    /// Report that a local transaction reached `version`.
    fn notify_commit_happened(&self, handle: u64, version: i64) -> PyResult<()> {
        let handle = self.handle(Operation::NotifyCommit, handle)?;
        self.inner
            .notify_commit_happened(handle, version)
            .map_err(to_py_err)
    }

    /// Lifecycle state name of a live session.
    fn state(&self, handle: u64) -> PyResult<&'static str> {
        let handle = self.handle(Operation::Describe, handle)?;
        let state = self.inner.state(handle).map_err(to_py_err)?;
        Ok(state.name())
    }

    /// Snapshot of a live session.
    fn describe(&self, handle: u64) -> PyResult<PySessionInfo> {
        let handle = self.handle(Operation::Describe, handle)?;
        let info = self.inner.describe(handle).map_err(to_py_err)?;
        Ok(bridge_info_to_py(info))
    }

    /// Force-unbind every live session. Returns how many were released.
    fn unbind_all(&self) -> usize {
        self.inner.unbind_all()
    }

    /// Bridge counters as a dict.
    fn metrics(&self) -> HashMap<&'static str, u64> {
        metrics_entries(&self.inner.metrics())
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!("SessionBridge(sessions={})", self.inner.len())
    }

    /// Async context manager entry: returns self.
    fn __aenter__<'py>(slf: Bound<'py, Self>, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let slf_py: Py<Self> = slf.unbind();
        pyo3_async_runtimes::tokio::future_into_py(py, async move { Ok(slf_py) })
    }

    /// Async context manager exit: releases every session.
    #[pyo3(signature = (_exc_type=None, _exc_val=None, _exc_tb=None))]
    fn __aexit__<'py>(
        &self,
        py: Python<'py>,
        _exc_type: Option<Bound<'py, PyAny>>,
        _exc_val: Option<Bound<'py, PyAny>>,
        _exc_tb: Option<Bound<'py, PyAny>>,
    ) -> PyResult<Bound<'py, PyAny>> {
        let bridge = Arc::clone(&self.inner);
        pyo3_async_runtimes::tokio::future_into_py(py, async move {
            bridge.unbind_all();
            Ok(false) // Don't suppress exceptions
        })
    }
}

// ============================================================
// Standalone functions
// ============================================================

/// Install a tracing subscriber writing to stderr.
///
/// Returns False if a subscriber was already installed.
#[pyfunction]
#[pyo3(signature = (filter="info"))]
fn init_logging(filter: &str) -> PyResult<bool> {
    let filter = EnvFilter::try_new(filter).map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok())
}

/// Stable numeric code for an exception class name, or None.
#[pyfunction]
fn error_code(exception: &str) -> Option<i32> {
    ALL_KINDS
        .iter()
        .find(|kind| exception_name(**kind) == exception)
        .map(|kind| kind.code())
}

const ALL_KINDS: [ErrorKind; 6] = [
    ErrorKind::InvalidHandle,
    ErrorKind::Marshaling,
    ErrorKind::EngineRejected,
    ErrorKind::InvalidState,
    ErrorKind::CapacityExhausted,
    ErrorKind::Internal,
];

// ============================================================
// Module definition
// ============================================================

#[pymodule]
fn _tether(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add_class::<PySessionBridge>()?;
    m.add_class::<PySessionInfo>()?;
    m.add("SessionError", py.get_type::<SessionError>())?;
    m.add("InvalidHandleError", py.get_type::<InvalidHandleError>())?;
    m.add("MarshalingError", py.get_type::<MarshalingError>())?;
    m.add("EngineRejectedError", py.get_type::<EngineRejectedError>())?;
    m.add("InvalidStateError", py.get_type::<InvalidStateError>())?;
    m.add("CapacityError", py.get_type::<CapacityError>())?;
    m.add("InternalError", py.get_type::<InternalError>())?;
    m.add("NULL_HANDLE", SessionHandle::NULL_RAW)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    m.add_function(wrap_pyfunction!(error_code, m)?)?;
    Ok(())
}

// ============================================================
// Tests: bridge-level only (no Python interpreter in tests)
// ============================================================
