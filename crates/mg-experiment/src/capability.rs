//! Host capabilities: randomness, wall clock, and the location query string
//!
//! The page never reaches for ambient globals; each capability is handed to
//! the components that need it so tests can pin it down.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Debug;
use std::sync::Arc;

/// Source of uniform draws in `[0, 1)`
pub trait RandomSource: Send + Sync + Debug {
    /// Next uniform draw
    fn unit(&self) -> f64;
}

/// Wall clock used to stamp events and submissions
pub trait Clock: Send + Sync + Debug {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// Shared random source handle
pub type SharedRandom = Arc<dyn RandomSource>;

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Thread-local RNG, unseeded
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Deterministic RNG for reproducible runs
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create from a seed
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Bernoulli draw with probability `p`, clamped to `[0, 1]`
    pub fn chance(&self, p: f64) -> bool {
        self.unit() < p.clamp(0.0, 1.0)
    }
}

impl RandomSource for SeededRandom {
    fn unit(&self) -> f64 {
        self.rng.lock().random::<f64>()
    }
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Parsed location search string
///
/// Lookups return the first occurrence of a name, matching
/// `URLSearchParams.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse `?a=b&c=d`; the leading `?` is optional
    #[must_use]
    pub fn parse(search: &str) -> Self {
        let search = search.strip_prefix('?').unwrap_or(search);
        let pairs = search
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (name, value) = part.split_once('=').unwrap_or((part, ""));
                (decode_component(name), decode_component(value))
            })
            .collect();
        Self { pairs }
    }

    /// First value for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether no parameters were supplied
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Form-urlencoded component decoding: `+` is a space, `%XX` is a byte,
/// malformed escapes pass through literally
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}
