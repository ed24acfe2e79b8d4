//! Per-worker randomness source.

use rand::seq::{SliceRandom, index};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Probability used for "rather low probability" decisions.
pub const LOW_PROBABILITY: f64 = 0.1;

/// Probability used for "small probability" decisions.
pub const SMALL_PROBABILITY: f64 = 0.01;

const INTERESTING_INTEGERS: &[i64] = &[
    0,
    1,
    -1,
    2,
    127,
    -128,
    255,
    32767,
    65535,
    i32::MAX as i64,
    i32::MIN as i64,
    u32::MAX as i64,
    i64::MAX,
    i64::MIN,
];

const INTERESTING_DOUBLES: &[f64] = &[
    0.0,
    -0.0,
    1.0,
    -1.0,
    f64::MAX,
    f64::MIN,
    f64::MIN_POSITIVE,
    f64::INFINITY,
    f64::NEG_INFINITY,
];

const STRING_ALPHABET: &[char] = &[
    'a', 'b', 'c', 'A', 'B', 'Z', '0', '1', '9', ' ', '%', '_', '\'', '"', '\\', '\n', '.', '-',
    '+', 'é', 'ß', '中', '🦀',
];

/// Random source threaded through every generator call.
///
/// Each worker owns one context. Runs are reproducible for a fixed seed
/// because every random decision in generation goes through this type.
pub struct Context {
    rng: ChaCha8Rng,
    seed: u64,
}

impl Context {
    /// Create a new context with a random seed.
    pub fn new() -> Self {
        Self::new_with_seed(rand::rng().random())
    }

    /// Create a new context with a specific seed.
    pub fn new_with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this context was (re)initialized with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the random stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.seed = seed;
    }

    /// Fair coin flip.
    pub fn gen_bool(&mut self) -> bool {
        self.rng.random()
    }

    /// Generate a random boolean with the given probability of being true.
    pub fn gen_bool_with_prob(&mut self, prob: f64) -> bool {
        self.rng.random_bool(prob.clamp(0.0, 1.0))
    }

    /// True with "rather low" probability.
    pub fn low_probability(&mut self) -> bool {
        self.gen_bool_with_prob(LOW_PROBABILITY)
    }

    /// True with "small" probability.
    pub fn small_probability(&mut self) -> bool {
        self.gen_bool_with_prob(SMALL_PROBABILITY)
    }

    /// Generate a random usize in the range [0, max).
    pub fn gen_range(&mut self, max: usize) -> usize {
        if max == 0 {
            0
        } else {
            self.rng.random_range(0..max)
        }
    }

    /// Generate a random usize in the range [min, max].
    pub fn gen_range_inclusive(&mut self, min: usize, max: usize) -> usize {
        if min >= max {
            min
        } else {
            self.rng.random_range(min..=max)
        }
    }

    /// Generate a random i64 in the range [min, max].
    pub fn gen_i64_range(&mut self, min: i64, max: i64) -> i64 {
        if min >= max {
            min
        } else {
            self.rng.random_range(min..=max)
        }
    }

    /// A small count, heavily biased towards zero. Never exceeds 3.
    pub fn small_number(&mut self) -> usize {
        let mut n = 0;
        while n < 3 && self.gen_bool_with_prob(0.4) {
            n += 1;
        }
        n
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            let idx = self.gen_range(items.len());
            Some(&items[idx])
        }
    }

    /// Random subset (possibly empty) that keeps the input order.
    pub fn subset<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        items.iter().filter(|_| self.gen_bool()).cloned().collect()
    }

    /// Random non-empty subset that keeps the input order.
    ///
    /// Returns an empty vector only when `items` is empty.
    pub fn non_empty_subset<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        if items.is_empty() {
            return Vec::new();
        }
        let keep = self.gen_range_inclusive(1, items.len());
        let mut indexes = index::sample(&mut self.rng, items.len(), keep).into_vec();
        indexes.sort_unstable();
        indexes.into_iter().map(|i| items[i].clone()).collect()
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Integer constant: boundary values, small numbers or anything in i64.
    pub fn gen_integer(&mut self) -> i64 {
        match self.gen_range(4) {
            0 => INTERESTING_INTEGERS[self.gen_range(INTERESTING_INTEGERS.len())],
            1 | 2 => self.gen_i64_range(-100, 100),
            _ => self.rng.random(),
        }
    }

    /// Floating point constant, including non-finite values.
    pub fn gen_double(&mut self) -> f64 {
        match self.gen_range(3) {
            0 => INTERESTING_DOUBLES[self.gen_range(INTERESTING_DOUBLES.len())],
            1 => self.rng.random_range(-1000.0..1000.0),
            _ => {
                let mantissa: f64 = self.rng.random_range(-1.0..1.0);
                let exponent = self.gen_i64_range(-300, 300) as i32;
                mantissa * 10f64.powi(exponent)
            }
        }
    }

    /// Text constant that may contain quotes, wildcards and non-ASCII.
    pub fn gen_string(&mut self) -> String {
        if self.low_probability() {
            return String::new();
        }
        let len = self.gen_range_inclusive(1, 8);
        (0..len)
            .map(|_| STRING_ALPHABET[self.gen_range(STRING_ALPHABET.len())])
            .collect()
    }

    /// Milliseconds since the epoch, within years 1900..=2100.
    pub fn gen_epoch_millis(&mut self) -> i64 {
        const MIN: i64 = -2_208_988_800_000;
        const MAX: i64 = 4_102_444_800_000;
        self.gen_i64_range(MIN, MAX)
    }

    /// Non-negative LIMIT/OFFSET value up to `i32::MAX`.
    pub fn gen_limit(&mut self) -> i64 {
        self.gen_i64_range(0, i32::MAX as i64)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
