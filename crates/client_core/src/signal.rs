//! Stream combinators the presenters are built from.
//!
//! Every signal is a boxed `Send` stream so presenters can hand them to any
//! display task without naming combinator types.

use futures::{
    future::{self, Either},
    stream::{self, BoxStream},
    Stream, StreamExt,
};

use crate::outcome::{FetchError, Outcome};

pub type Signal<T> = BoxStream<'static, T>;

/// Emits the latest pair whenever either side emits, once both sides have
/// produced at least one value.
pub fn combine_latest<A, B>(
    left: impl Stream<Item = A> + Send + 'static,
    right: impl Stream<Item = B> + Send + 'static,
) -> Signal<(A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    stream::select(left.map(Either::Left), right.map(Either::Right))
        .scan((None, None), |latest: &mut (Option<A>, Option<B>), item| {
            match item {
                Either::Left(a) => latest.0 = Some(a),
                Either::Right(b) => latest.1 = Some(b),
            }
            future::ready(Some(latest.0.clone().zip(latest.1.clone())))
        })
        .filter_map(future::ready)
        .boxed()
}

pub fn start_with<T>(first: T, rest: impl Stream<Item = T> + Send + 'static) -> Signal<T>
where
    T: Send + 'static,
{
    stream::once(future::ready(first)).chain(rest).boxed()
}

/// Drops values equal to the one emitted just before them.
pub fn distinct_until_changed<T>(values: impl Stream<Item = T> + Send + 'static) -> Signal<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    values
        .scan(None, |last: &mut Option<T>, item| {
            if last.as_ref() == Some(&item) {
                return future::ready(Some(None));
            }
            *last = Some(item.clone());
            future::ready(Some(Some(item)))
        })
        .filter_map(future::ready)
        .boxed()
}

pub fn only_success<T>(outcomes: impl Stream<Item = Outcome<T>> + Send + 'static) -> Signal<T>
where
    T: Send + 'static,
{
    outcomes
        .filter_map(|outcome| future::ready(outcome.into_success()))
        .boxed()
}

/// Maps every outcome to its failure, `None` for successes.
pub fn failures<T>(
    outcomes: impl Stream<Item = Outcome<T>> + Send + 'static,
) -> Signal<Option<FetchError>>
where
    T: Send + 'static,
{
    outcomes
        .map(|outcome| outcome.failure().cloned())
        .boxed()
}

#[cfg(test)]
#[path = "tests/signal_tests.rs"]
mod tests;
