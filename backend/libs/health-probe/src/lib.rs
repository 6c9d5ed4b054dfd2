//! Liveness and readiness probes
//!
//! This crate depends on neither the database pool nor the cache, and that is
//! the whole design: the hosting platform restarts the process when liveness
//! fails, so a liveness check that transitively waits on a slow external
//! dependency turns a partial outage into a restart storm. Liveness answers
//! "is the process alive" in constant time with zero I/O. Readiness reads
//! signals that component owners flip after their own warm-up; it never
//! triggers a connect, a retry, or any network call itself.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::info;

/// Cloneable readiness flag owned by one component (pool, cache, consumer).
/// The component flips it after its own warm-up; the probe only reads it.
#[derive(Clone)]
pub struct ReadinessSignal {
    name: Arc<str>,
    ready: Arc<AtomicBool>,
}

impl ReadinessSignal {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_ready(&self) {
        if !self.ready.swap(true, Ordering::SeqCst) {
            info!(component = %self.name, "component reported ready");
        }
    }

    pub fn set_not_ready(&self) {
        if self.ready.swap(false, Ordering::SeqCst) {
            info!(component = %self.name, "component reported not ready");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Liveness snapshot. Producing one touches nothing but the process clock.
#[derive(Debug, Clone, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentReadiness {
    pub component: String,
    pub ready: bool,
}

/// Readiness snapshot: ready only when every registered component is.
#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub components: Vec<ComponentReadiness>,
}

/// Process health probe.
pub struct HealthProbe {
    started_at: Instant,
    signals: RwLock<Vec<ReadinessSignal>>,
}

impl HealthProbe {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            signals: RwLock::new(Vec::new()),
        }
    }

    /// Register a component and get the signal handle its owner will flip.
    /// Call during startup wiring, before serving traffic.
    pub fn register(&self, component: &str) -> ReadinessSignal {
        let signal = ReadinessSignal::new(component);
        self.signals
            .write()
            .expect("readiness signal lock poisoned")
            .push(signal.clone());
        signal
    }

    /// Constant-time liveness: no locks, no I/O, nothing that can block on an
    /// external dependency.
    pub fn liveness(&self) -> Liveness {
        Liveness {
            status: "alive",
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    /// Readiness from registered signals only. A process with no registered
    /// components is trivially ready.
    pub fn readiness(&self) -> Readiness {
        let signals = self
            .signals
            .read()
            .expect("readiness signal lock poisoned");
        let components: Vec<ComponentReadiness> = signals
            .iter()
            .map(|s| ComponentReadiness {
                component: s.name().to_string(),
                ready: s.is_ready(),
            })
            .collect();
        Readiness {
            ready: components.iter().all(|c| c.ready),
            components,
        }
    }
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_liveness_is_fast_and_alive() {
        let probe = HealthProbe::new();
        let start = Instant::now();
        let report = probe.liveness();
        assert!(
            start.elapsed() < Duration::from_millis(5),
            "liveness must complete within its fixed bound"
        );
        assert_eq!(report.status, "alive");
    }

    #[test]
    fn test_readiness_requires_every_component() {
        let probe = HealthProbe::new();
        let db = probe.register("database");
        let cache = probe.register("cache");

        assert!(!probe.readiness().ready);

        db.set_ready();
        let partial = probe.readiness();
        assert!(!partial.ready);
        assert_eq!(partial.components.len(), 2);

        cache.set_ready();
        assert!(probe.readiness().ready);

        db.set_not_ready();
        assert!(!probe.readiness().ready);
    }

    #[test]
    fn test_empty_probe_is_trivially_ready() {
        let probe = HealthProbe::new();
        assert!(probe.readiness().ready);
        assert!(probe.readiness().components.is_empty());
    }

    #[test]
    fn test_reports_serialize_for_route_handlers() {
        let probe = HealthProbe::new();
        let signal = probe.register("database");
        signal.set_ready();

        let live = serde_json::to_value(probe.liveness()).unwrap();
        assert_eq!(live["status"], "alive");

        let ready = serde_json::to_value(probe.readiness()).unwrap();
        assert_eq!(ready["ready"], true);
        assert_eq!(ready["components"][0]["component"], "database");
    }
}
