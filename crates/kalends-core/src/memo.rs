//! Single-slot memoization
//!
//! Every derivation site owns one memo that remembers only its most recent
//! call. Derivations run at most once per action cycle, so one slot is all a
//! site ever needs, and a hit hands back the previous result itself (same
//! `Rc`), which is what lets downstream code compare snapshots by identity.
//!
//! Two disciplines are offered:
//! - [`Memo`] keys on a flat argument tuple.
//! - [`MemoObj`] keys on one props struct compared field by field, so a
//!   freshly built wrapper with unchanged fields still hits.
//!
//! Argument comparison goes through [`Same`]: shared handles (`Rc`,
//! [`OptionSet`]) compare by identity, plain data compares by value.

use crate::date::{DateRange, OpenDateRange, Unit};
use crate::duration::Duration;
use crate::options::OptionSet;
use crate::value::Value;
use chrono::NaiveDateTime;
use std::rc::{Rc, Weak};

/// The equality used to decide whether a memoized call may be reused
pub trait Same {
    fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Same for Rc<T> {
    fn same(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(self), Rc::as_ptr(other))
    }
}

impl<T: ?Sized> Same for Weak<T> {
    fn same(&self, other: &Self) -> bool {
        std::ptr::addr_eq(self.as_ptr(), other.as_ptr())
    }
}

impl Same for OptionSet {
    fn same(&self, other: &Self) -> bool {
        OptionSet::same(self, other)
    }
}

impl<T: Same> Same for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Same> Same for Vec<T> {
    fn same(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same(b))
    }
}

macro_rules! same_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Same for $ty {
                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_by_value!(
    bool, i32, i64, u32, usize, String, Value, Duration, Unit, NaiveDateTime, DateRange,
    OpenDateRange,
);

macro_rules! same_for_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: Same),+> Same for ($($name,)+) {
            fn same(&self, other: &Self) -> bool {
                $(self.$idx.same(&other.$idx))&&+
            }
        }
    };
}

same_for_tuple!(A 0);
same_for_tuple!(A 0, B 1);
same_for_tuple!(A 0, B 1, C 2);
same_for_tuple!(A 0, B 1, C 2, D 3);
same_for_tuple!(A 0, B 1, C 2, D 3, E 4);
same_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
same_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);

/// Remembers the most recent call of one derivation
pub struct Memo<A, R> {
    slot: Option<(A, R)>,
    result_eq: Option<fn(&R, &R) -> bool>,
    label: &'static str,
}

impl<A: Same, R: Clone> Memo<A, R> {
    pub fn new(label: &'static str) -> Self {
        Self {
            slot: None,
            result_eq: None,
            label,
        }
    }

    /// Keep the previous result when a recomputation yields an equal one
    ///
    /// Used where inputs churn but the derived value rarely does, so the
    /// result's identity stays stable for consumers downstream.
    pub fn with_result_eq(label: &'static str, result_eq: fn(&R, &R) -> bool) -> Self {
        Self {
            slot: None,
            result_eq: Some(result_eq),
            label,
        }
    }

    /// Return the cached result for `args`, computing it on a miss
    pub fn get(&mut self, args: A, compute: impl FnOnce(&A) -> R) -> R {
        match self.try_get(args, |a| Ok::<R, std::convert::Infallible>(compute(a))) {
            Ok(res) => res,
            Err(never) => match never {},
        }
    }

    /// Fallible variant: a failed computation leaves the previous slot intact
    pub fn try_get<E>(&mut self, args: A, compute: impl FnOnce(&A) -> Result<R, E>) -> Result<R, E> {
        if let Some((prev_args, prev_res)) = &self.slot {
            if prev_args.same(&args) {
                return Ok(prev_res.clone());
            }
        }

        tracing::trace!(memo = self.label, "memo miss");
        let mut res = compute(&args)?;
        if let (Some(eq), Some((_, prev_res))) = (self.result_eq, &self.slot) {
            if eq(&res, prev_res) {
                res = prev_res.clone();
            }
        }
        self.slot = Some((args, res.clone()));
        Ok(res)
    }

    /// Forget the cached call
    pub fn clear(&mut self) {
        self.slot = None;
    }
}

/// Memo keyed by a single props struct
///
/// The struct's [`Same`] impl decides what counts as a change, which lets
/// callers rebuild the props every cycle without defeating the cache.
pub struct MemoObj<P, R> {
    inner: Memo<P, R>,
}

impl<P: Same, R: Clone> MemoObj<P, R> {
    pub fn new(label: &'static str) -> Self {
        Self {
            inner: Memo::new(label),
        }
    }

    pub fn get(&mut self, props: P, compute: impl FnOnce(&P) -> R) -> R {
        self.inner.get(props, compute)
    }

    pub fn try_get<E>(&mut self, props: P, compute: impl FnOnce(&P) -> Result<R, E>) -> Result<R, E> {
        self.inner.try_get(props, compute)
    }
}
