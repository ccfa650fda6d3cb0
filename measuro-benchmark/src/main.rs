//! Measures how much a CPU-bound loop slows down when instrumented with measuro.
//!
//! The loop tests integers for primality for a fixed duration, once with metrics disabled and
//! once with them enabled.  The score is the work done with metrics as a proportion of the work
//! done without them, so closer to 1.0 is better.  Scores are only comparable on the same
//! hardware and OS.

use getopts::Options;
use hdrhistogram::{CreationError, Histogram as HdrHistogram};
use log::{error, info};
use measuro::{Descriptor, RateMetric, Registry, SignedMetric, StringMetric, Throttle};
use quanta::Clock;
use std::{env, sync::Arc, time::Duration};

const LOOP_SAMPLE: u64 = 1000;
const TEST_COUNT_INTERVAL: u64 = 10_000;
const PRIME_KEYS: [&str; 6] = ["KEY_A", "KEY_B", "KEY_C", "KEY_D", "KEY_E", "KEY_F"];

struct Metrics {
    registry: Registry,
    test_count: Arc<SignedMetric>,
    prime_count: Arc<SignedMetric>,
    test_rate: Arc<RateMetric<SignedMetric>>,
    last_prime_key: Throttle<StringMetric>,
}

impl Metrics {
    fn new() -> Result<Metrics, measuro::MeasuroError> {
        let registry = Registry::new();

        let test_count = registry.create_signed(
            Descriptor::new("TestCount")
                .unit("integer(s)")
                .description("The number of integers tested for primality"),
            0,
        )?;
        let prime_count = registry.create_signed(
            Descriptor::new("PrimeCount")
                .unit("integer(s)")
                .description("The number of integers found to be primes"),
            0,
        )?;
        let test_rate = registry.create_rate(
            Descriptor::new("TestRate")
                .unit("integers/s")
                .description("The number of integers tested for primality per second"),
            Arc::clone(&test_count),
        )?;
        let last_prime_key = registry.create_string(
            Descriptor::new("LastPrimeKey")
                .description("A string key arbitrarily associated with the last found prime"),
            "val",
        )?;
        let last_prime_key =
            registry.throttle_with_op_limit(&last_prime_key, Duration::from_millis(100), 100);

        Ok(Metrics { registry, test_count, prime_count, test_rate, last_prime_key })
    }
}

struct Workload {
    clock: Clock,
    duration: Duration,
    hist: HdrHistogram<u64>,
}

impl Workload {
    fn new(duration: Duration) -> Result<Workload, CreationError> {
        Ok(Workload {
            clock: Clock::new(),
            duration,
            hist: HdrHistogram::<u64>::new_with_bounds(1, u64::MAX, 3)?,
        })
    }

    /// Tests candidates until the workload's duration has passed, returning how many were tested.
    fn run(&mut self, metrics: Option<&mut Metrics>) -> u64 {
        // A duration past the clock's range runs until the process is stopped.
        let end = self.clock.now().checked_add(self.duration);
        let mut metrics = metrics;
        if let Some(m) = metrics.as_deref_mut() {
            m.test_count.set(0);
            m.prime_count.set(0);
        }

        let mut candidate: u64 = 0;
        while end.map_or(true, |end| self.clock.now() < end) {
            let prime = is_prime(candidate);

            if let Some(m) = metrics.as_deref_mut() {
                let start =
                    if candidate % LOOP_SAMPLE == 0 { Some(self.clock.now()) } else { None };

                if prime {
                    m.prime_count.increment();
                    m.last_prime_key.set(PRIME_KEYS[(candidate % 6) as usize].to_owned());
                }
                if candidate % TEST_COUNT_INTERVAL == 0 {
                    m.test_count.set(candidate as i64 + 1);
                }

                if let Some(val) = start {
                    let delta = self.clock.now() - val;
                    self.hist.saturating_record(delta.as_nanos() as u64);
                }
            }

            candidate += 1;
        }

        candidate.saturating_sub(1)
    }

    fn report(&self) {
        if self.hist.is_empty() {
            return;
        }

        info!(
            "    update latency: min: {:8} p50: {:8} p95: {:8} p99: {:8} p999: {:8} max: {:8}",
            nanos_to_readable(self.hist.min()),
            nanos_to_readable(self.hist.value_at_percentile(50.0)),
            nanos_to_readable(self.hist.value_at_percentile(95.0)),
            nanos_to_readable(self.hist.value_at_percentile(99.0)),
            nanos_to_readable(self.hist.value_at_percentile(99.9)),
            nanos_to_readable(self.hist.max())
        );
    }
}

/// Trial division by 6k ± 1.
fn is_prime(n: u64) -> bool {
    if n <= 1 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }

    let mut i = 5;
    while i * i <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Work done with metrics as a proportion of work done without, clamped to `0.0..=1.0`.
fn score(without: f64, with: f64) -> f64 {
    if without <= 0.0 || with <= 0.0 {
        return 0.0;
    }
    (with / without).clamp(0.0, 1.0)
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

pub fn opts() -> Options {
    let mut opts = Options::new();

    opts.optopt("d", "duration", "number of seconds each run lasts", "INTEGER");
    opts.optopt("r", "runs", "number of runs with and without metrics", "INTEGER");
    opts.optflag("v", "version", "print version information");
    opts.optflag("h", "help", "print this help menu");

    opts
}

fn parse_opt(matches: &getopts::Matches, name: &str, default: u64) -> Result<u64, String> {
    match matches.opt_str(name) {
        Some(s) => s.parse().map_err(|e| format!("invalid value for --{}: {}", name, e)),
        None => Ok(default),
    }
}

fn main() {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = opts();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            error!("Failed to parse command line args: {}", f);
            return;
        }
    };

    if matches.opt_present("help") {
        print_usage(program, &opts);
        return;
    }

    if matches.opt_present("version") {
        println!("{}", measuro::COPYRIGHT);
        return;
    }

    let (seconds, runs) =
        match (parse_opt(&matches, "duration", 5), parse_opt(&matches, "runs", 3)) {
            (Ok(d), Ok(r)) if r > 0 => (d, r),
            (Err(e), _) | (_, Err(e)) => {
                error!("{}", e);
                return;
            }
            _ => {
                error!("--runs must be at least 1");
                return;
            }
        };

    info!("measuro benchmark");
    info!("duration: {}s", seconds);
    info!("runs: {}", runs);

    let mut metrics = match Metrics::new() {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to create metrics: {}", e);
            return;
        }
    };

    let duration = Duration::from_secs(seconds);
    let mut without_total = 0;
    let mut with_total = 0;

    for run in 1..=runs {
        let (mut baseline, mut workload) = match (Workload::new(duration), Workload::new(duration)) {
            (Ok(b), Ok(w)) => (b, w),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to create latency histogram: {}", e);
                return;
            }
        };

        let without = baseline.run(None);
        let with = workload.run(Some(&mut metrics));

        info!(
            "run {}: without metrics: {} with metrics: {} score: {:.4}",
            run,
            without,
            with,
            score(without as f64, with as f64)
        );
        info!(
            "    {} primes, {:.0} tests/s",
            metrics.prime_count.get(),
            metrics.test_rate.calculate()
        );
        workload.report();

        without_total += without;
        with_total += with;
    }

    let without_mean = without_total as f64 / runs as f64;
    let with_mean = with_total as f64 / runs as f64;

    info!("--------------------------------------------------------------------------------");
    info!(" registered metrics: {}", metrics.registry.len());
    println!("Work items, without metrics = {:.0}", without_mean);
    println!("Work items, with metrics = {:.0}", with_mean);
    println!("Score = {:.4}", score(without_mean, with_mean));
    println!("        ^ (closer to 1.0 is better)");
}

fn nanos_to_readable(t: u64) -> String {
    let f = t as f64;
    if f < 1_000.0 {
        format!("{}ns", f)
    } else if f < 1_000_000.0 {
        format!("{:.0}μs", f / 1_000.0)
    } else if f < 2_000_000_000.0 {
        format!("{:.2}ms", f / 1_000_000.0)
    } else {
        format!("{:.3}s", f / 1_000_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primes_below_thirty() {
        let primes: Vec<u64> = (0..30).filter(|n| is_prime(*n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(score(100.0, 90.0), 0.9);
        assert_eq!(score(100.0, 120.0), 1.0);
        assert_eq!(score(0.0, 10.0), 0.0);
    }

    #[test]
    fn metrics_are_registered() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.registry.names(), vec!["LastPrimeKey", "PrimeCount", "TestCount", "TestRate"]);
    }
}
