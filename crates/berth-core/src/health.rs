use crate::signal::shutdown_requested;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

const DEADLINE: Duration = Duration::from_secs(120);
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HealthError {
    #[error("health checks failed after {seconds}s: {}", failed.join(", "))]
    Failed { seconds: u64, failed: Vec<String> },
    #[error("health wait interrupted; still pending: {}", pending.join(", "))]
    Interrupted { pending: Vec<String> },
}

/// A single HTTP poll. Healthy means any 2xx response within the probe
/// timeout; connection errors and other status classes are unhealthy.
pub trait HttpProbe {
    fn check(&self, url: &str) -> bool;
}

pub struct UreqProbe {
    agent: ureq::Agent,
}

impl UreqProbe {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(PROBE_TIMEOUT))
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for UreqProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpProbe for UreqProbe {
    fn check(&self, url: &str) -> bool {
        match self.agent.get(url).call() {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Time and cancellation seam so the wait loop is testable without sleeping
/// or raising real signals.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);

    /// Checked between polling rounds; a true return stops the wait.
    fn cancelled(&self) -> bool {
        false
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn cancelled(&self) -> bool {
        shutdown_requested()
    }
}

/// Poll every probe until all have passed at least once or the deadline
/// expires. A probe that has passed is not polled again. Ctrl-C interrupts
/// the wait between rounds.
///
/// Failure lists the still-pending probes as `name (url)`, sorted by name.
pub fn wait_for_health(
    probes: &BTreeMap<String, String>,
    probe: &dyn HttpProbe,
    clock: &dyn Clock,
) -> Result<(), HealthError> {
    if probes.is_empty() {
        return Ok(());
    }

    let mut pending: BTreeMap<&str, &str> = probes
        .iter()
        .map(|(name, url)| (name.as_str(), url.as_str()))
        .collect();

    let start = clock.now();
    loop {
        pending.retain(|name, url| {
            let healthy = probe.check(url);
            debug!(service = %name, url = %url, healthy, "health poll");
            !healthy
        });
        if pending.is_empty() {
            return Ok(());
        }

        let describe = |pending: &BTreeMap<&str, &str>| -> Vec<String> {
            pending
                .iter()
                .map(|(name, url)| format!("{name} ({url})"))
                .collect()
        };
        if clock.cancelled() {
            return Err(HealthError::Interrupted {
                pending: describe(&pending),
            });
        }
        if clock.now().duration_since(start) + POLL_INTERVAL > DEADLINE {
            return Err(HealthError::Failed {
                seconds: DEADLINE.as_secs(),
                failed: describe(&pending),
            });
        }
        clock.sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct FakeClock {
        now: Cell<Instant>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                now: Cell::new(Instant::now()),
            }
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.now.get()
        }

        fn sleep(&self, duration: Duration) {
            self.now.set(self.now.get() + duration);
        }
    }

    struct ScriptedProbe {
        // url -> number of failing polls before it turns healthy
        failures: RefCell<BTreeMap<String, u32>>,
    }

    impl ScriptedProbe {
        fn new(failures: &[(&str, u32)]) -> Self {
            Self {
                failures: RefCell::new(
                    failures
                        .iter()
                        .map(|(url, n)| ((*url).to_owned(), *n))
                        .collect(),
                ),
            }
        }
    }

    impl HttpProbe for ScriptedProbe {
        fn check(&self, url: &str) -> bool {
            let mut failures = self.failures.borrow_mut();
            match failures.get_mut(url) {
                Some(0) | None => true,
                Some(n) => {
                    *n -= 1;
                    false
                }
            }
        }
    }

    fn probes(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(name, url)| ((*name).to_owned(), (*url).to_owned()))
            .collect()
    }

    #[test]
    fn no_probes_is_immediately_healthy() {
        let probe = ScriptedProbe::new(&[]);
        wait_for_health(&BTreeMap::new(), &probe, &FakeClock::new()).unwrap();
    }

    #[test]
    fn waits_until_all_probes_pass() {
        let targets = probes(&[
            ("api", "http://localhost:8080/health"),
            ("web", "http://localhost:3000/health"),
        ]);
        let probe = ScriptedProbe::new(&[
            ("http://localhost:8080/health", 3),
            ("http://localhost:3000/health", 1),
        ]);
        wait_for_health(&targets, &probe, &FakeClock::new()).unwrap();
    }

    #[test]
    fn deadline_reports_pending_probes_sorted() {
        let targets = probes(&[
            ("zeta", "http://localhost:2/health"),
            ("alpha", "http://localhost:1/health"),
        ]);
        let probe = ScriptedProbe::new(&[
            ("http://localhost:1/health", u32::MAX),
            ("http://localhost:2/health", u32::MAX),
        ]);
        let err = wait_for_health(&targets, &probe, &FakeClock::new()).unwrap_err();
        assert_eq!(
            err,
            HealthError::Failed {
                seconds: 120,
                failed: vec![
                    "alpha (http://localhost:1/health)".to_owned(),
                    "zeta (http://localhost:2/health)".to_owned(),
                ],
            }
        );
    }

    #[test]
    fn cancellation_reports_pending_probes() {
        // Cancels after the given number of polling rounds.
        struct CancellingClock {
            inner: FakeClock,
            rounds_left: Cell<u32>,
        }

        impl Clock for CancellingClock {
            fn now(&self) -> Instant {
                self.inner.now()
            }

            fn sleep(&self, duration: Duration) {
                self.inner.sleep(duration);
            }

            fn cancelled(&self) -> bool {
                let left = self.rounds_left.get();
                if left == 0 {
                    return true;
                }
                self.rounds_left.set(left - 1);
                false
            }
        }

        let targets = probes(&[
            ("api", "http://localhost:8080/health"),
            ("db", "http://localhost:5432/health"),
        ]);
        let probe = ScriptedProbe::new(&[
            ("http://localhost:8080/health", u32::MAX),
            ("http://localhost:5432/health", 1),
        ]);
        let clock = CancellingClock {
            inner: FakeClock::new(),
            rounds_left: Cell::new(2),
        };
        let err = wait_for_health(&targets, &probe, &clock).unwrap_err();
        assert_eq!(
            err,
            HealthError::Interrupted {
                pending: vec!["api (http://localhost:8080/health)".to_owned()],
            }
        );
    }

    #[test]
    fn passed_probes_are_not_polled_again() {
        struct CountingProbe {
            calls: RefCell<BTreeMap<String, u32>>,
        }
        impl HttpProbe for CountingProbe {
            fn check(&self, url: &str) -> bool {
                let mut calls = self.calls.borrow_mut();
                let count = calls.entry(url.to_owned()).or_insert(0);
                *count += 1;
                // "fast" passes first poll, "slow" needs three.
                url.contains("fast") || *count >= 3
            }
        }

        let targets = probes(&[
            ("fast", "http://localhost:1/fast"),
            ("slow", "http://localhost:2/slow"),
        ]);
        let probe = CountingProbe {
            calls: RefCell::new(BTreeMap::new()),
        };
        wait_for_health(&targets, &probe, &FakeClock::new()).unwrap();

        let calls = probe.calls.borrow();
        assert_eq!(calls["http://localhost:1/fast"], 1);
        assert_eq!(calls["http://localhost:2/slow"], 3);
    }
}
