use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use measuro::{MeasuroError, Metric, Registry, RenderError, Renderer};
use parking_lot::Mutex;

#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
    fail_before: bool,
    fail_render_on: Option<&'static str>,
    fail_after: bool,
    suppressed: bool,
}

impl Renderer for Recorder {
    fn before(&mut self) -> Result<(), RenderError> {
        if self.fail_before {
            return Err(io::Error::new(io::ErrorKind::Other, "before").into());
        }
        self.calls.push("before".to_owned());
        Ok(())
    }

    fn render(&mut self, metric: &Metric) -> Result<(), RenderError> {
        if self.fail_render_on == Some(metric.name()) {
            return Err(io::Error::new(io::ErrorKind::Other, "render").into());
        }
        self.calls.push(format!("{}={}", metric.name(), metric));
        Ok(())
    }

    fn after(&mut self) -> Result<(), RenderError> {
        self.calls.push("after".to_owned());
        if self.fail_after {
            return Err(io::Error::new(io::ErrorKind::Other, "after").into());
        }
        Ok(())
    }

    fn suppressed_error(&self) -> bool {
        self.suppressed
    }

    fn set_suppressed_error(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }
}

fn populated() -> Registry {
    let registry = Registry::new();
    registry.create_unsigned("c", 3).unwrap();
    registry.create_string("a", "one").unwrap();
    registry.create_signed("b", -2).unwrap();
    registry
}

#[test]
fn render_brackets_metrics_in_name_order() {
    let registry = populated();
    let mut recorder = Recorder::default();

    registry.render(&mut recorder, "").unwrap();

    assert_eq!(recorder.calls, vec!["before", "a=one", "b=-2", "c=3", "after"]);
}

#[test]
fn prefix_filters_metrics() {
    let registry = Registry::new();
    registry.create_unsigned("net.bytes_in", 1).unwrap();
    registry.create_unsigned("net.bytes_out", 2).unwrap();
    registry.create_unsigned("disk.reads", 3).unwrap();
    registry.create_unsigned("network", 4).unwrap();

    let mut recorder = Recorder::default();
    registry.render(&mut recorder, "net.").unwrap();
    assert_eq!(recorder.calls, vec!["before", "net.bytes_in=1", "net.bytes_out=2", "after"]);

    let mut recorder = Recorder::default();
    registry.render(&mut recorder, "zzz").unwrap();
    assert_eq!(recorder.calls, vec!["before", "after"]);
}

#[test]
fn derived_metrics_are_calculated_before_rendering() {
    let registry = Registry::new();
    let a = registry.create_float("a", 10.25).unwrap();
    let b = registry.create_float("b", 35.25).unwrap();
    let total = registry.create_sum("total", vec![a, b]).unwrap();
    assert_eq!(total.get(), 0.0);

    let mut recorder = Recorder::default();
    registry.render(&mut recorder, "total").unwrap();

    assert_eq!(recorder.calls, vec!["before", "total=45.50", "after"]);
}

#[test]
fn after_failure_is_suppressed_then_cleared() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let registry = populated();
    let mut recorder = Recorder { fail_after: true, ..Default::default() };

    registry.render(&mut recorder, "").unwrap();
    assert!(recorder.suppressed_error());
    assert_eq!(recorder.calls.last().map(String::as_str), Some("after"));

    recorder.fail_after = false;
    registry.render(&mut recorder, "").unwrap();
    assert!(!recorder.suppressed_error());
}

#[test]
fn before_failure_propagates_without_after() {
    let registry = populated();
    let mut recorder = Recorder { fail_before: true, ..Default::default() };

    let err = registry.render(&mut recorder, "").unwrap_err();
    assert!(matches!(err, MeasuroError::Render(_)));
    assert!(recorder.calls.is_empty());
}

#[test]
fn render_failure_propagates_after_cleanup() {
    let registry = populated();
    let mut recorder = Recorder { fail_render_on: Some("b"), ..Default::default() };

    let err = registry.render(&mut recorder, "").unwrap_err();
    assert!(matches!(err, MeasuroError::Render(_)));
    assert_eq!(recorder.calls, vec!["before", "a=one", "after"]);
    assert!(!recorder.suppressed_error());
}

#[test]
fn render_while_other_threads_create_and_update() {
    const WORKERS: usize = 4;
    const METRICS_PER_WORKER: usize = 50;
    const INCREMENTS: u64 = 100;

    let registry = Registry::new();
    let created = registry.create_unsigned("created", 0).unwrap();

    thread::scope(|s| {
        for worker in 0..WORKERS {
            let registry = &registry;
            let created = &created;
            s.spawn(move || {
                for i in 0..METRICS_PER_WORKER {
                    let metric =
                        registry.create_unsigned(format!("worker{}.m{:02}", worker, i), 0).unwrap();
                    for _ in 0..INCREMENTS {
                        metric.increment();
                    }
                    created.increment();
                }
            });
        }

        s.spawn(|| {
            for _ in 0..50 {
                let mut recorder = Recorder::default();
                registry.render(&mut recorder, "").unwrap();

                let calls = &recorder.calls;
                assert_eq!(calls.first().map(String::as_str), Some("before"));
                assert_eq!(calls.last().map(String::as_str), Some("after"));

                let names: Vec<&str> = calls[1..calls.len() - 1]
                    .iter()
                    .map(|call| call.split('=').next().unwrap_or_default())
                    .collect();
                assert!(names.windows(2).all(|pair| pair[0] < pair[1]));
            }
        });
    });

    assert_eq!(registry.len(), 1 + WORKERS * METRICS_PER_WORKER);
    assert_eq!(created.get(), (WORKERS * METRICS_PER_WORKER) as u64);

    let mut recorder = Recorder::default();
    registry.render(&mut recorder, "worker").unwrap();
    assert_eq!(recorder.calls.len(), WORKERS * METRICS_PER_WORKER + 2);
    assert!(recorder.calls[1..recorder.calls.len() - 1]
        .iter()
        .all(|call| call.ends_with(&format!("={}", INCREMENTS))));
}

struct Counting {
    passes: Arc<AtomicUsize>,
    last: Arc<Mutex<Vec<String>>>,
    suppressed: bool,
}

impl Renderer for Counting {
    fn before(&mut self) -> Result<(), RenderError> {
        self.last.lock().clear();
        Ok(())
    }

    fn render(&mut self, metric: &Metric) -> Result<(), RenderError> {
        self.last.lock().push(metric.to_string());
        Ok(())
    }

    fn after(&mut self) -> Result<(), RenderError> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn suppressed_error(&self) -> bool {
        self.suppressed
    }

    fn set_suppressed_error(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }
}

fn counting() -> (Counting, Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>) {
    let passes = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(Vec::new()));
    let renderer = Counting { passes: Arc::clone(&passes), last: Arc::clone(&last), suppressed: false };
    (renderer, passes, last)
}

fn wait_for_passes(passes: &AtomicUsize, target: usize) {
    for _ in 0..500 {
        if passes.load(Ordering::SeqCst) >= target {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("scheduled renders did not happen in time");
}

#[test]
fn schedule_renders_until_cancelled() {
    let registry = Registry::new();
    let hits = registry.create_unsigned("hits", 0).unwrap();
    hits.add(41);

    let (renderer, passes, last) = counting();
    registry.render_schedule(renderer, Duration::from_millis(10)).unwrap();
    assert!(registry.is_scheduled());

    wait_for_passes(&passes, 3);
    assert_eq!(*last.lock(), vec!["41".to_owned()]);

    let renderer = registry.cancel_render_schedule();
    assert!(renderer.is_some());
    assert!(!registry.is_scheduled());

    let settled = passes.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(passes.load(Ordering::SeqCst), settled);

    assert!(registry.cancel_render_schedule().is_none());
}

#[test]
fn new_schedule_replaces_the_old_one() {
    let registry = Registry::new();
    registry.create_unsigned("hits", 0).unwrap();

    let (first, first_passes, _) = counting();
    registry.render_schedule(first, Duration::from_millis(10)).unwrap();
    wait_for_passes(&first_passes, 1);

    let (second, second_passes, _) = counting();
    registry.render_schedule(second, Duration::from_millis(10)).unwrap();
    let settled = first_passes.load(Ordering::SeqCst);

    wait_for_passes(&second_passes, 2);
    assert_eq!(first_passes.load(Ordering::SeqCst), settled);
}

#[test]
fn dropping_the_registry_stops_the_schedule() {
    let (renderer, passes, _) = counting();
    {
        let registry = Registry::new();
        registry.create_unsigned("hits", 0).unwrap();
        registry.render_schedule(renderer, Duration::from_millis(10)).unwrap();
        wait_for_passes(&passes, 1);
    }

    let settled = passes.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(passes.load(Ordering::SeqCst), settled);
}
