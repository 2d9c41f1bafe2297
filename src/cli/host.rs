//! Externs the `mlang` binary provides to scripts.

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::interpreter::{Externs, MValue};

/// Math, clock and random-number functions callable as `$$name(...)`
pub fn host_externs() -> Externs {
    let rand = XorShift::from_clock();

    Externs::new()
        .with("sqrt", |args: &[MValue]| unary(args, f64::sqrt))
        .with("abs", |args: &[MValue]| unary(args, f64::abs))
        .with("floor", |args: &[MValue]| unary(args, f64::floor))
        .with("sin", |args: &[MValue]| unary(args, f64::sin))
        .with("cos", |args: &[MValue]| unary(args, f64::cos))
        .with("pow", |args: &[MValue]| {
            Some(MValue::Num(number(args, 0).powf(number(args, 1))))
        })
        .with("random", move |args: &[MValue]| Some(MValue::Num(rand.sample(args))))
        .with("time", |_: &[MValue]| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            Some(MValue::Num(now.as_secs_f64()))
        })
}

fn number(args: &[MValue], index: usize) -> f64 {
    args.get(index).map_or(0.0, MValue::to_number)
}

fn unary(args: &[MValue], f: fn(f64) -> f64) -> Option<MValue> {
    Some(MValue::Num(f(number(args, 0))))
}

/// Small non-cryptographic generator for `$$random`
pub(crate) struct XorShift {
    state: Cell<u64>,
}

impl XorShift {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: Cell::new(seed.max(1)),
        }
    }

    fn from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self::new(seed)
    }

    fn next(&self) -> u64 {
        let mut x = self.state.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state.set(x);
        x
    }

    /// `random(n)` is an integer in `0..n`; without a positive bound, a
    /// fraction in `[0, 1)`
    pub(crate) fn sample(&self, args: &[MValue]) -> f64 {
        let bound = number(args, 0).trunc();
        if bound >= 1.0 {
            (self.next() % bound as u64) as f64
        } else {
            (self.next() >> 11) as f64 / (1u64 << 53) as f64
        }
    }
}
