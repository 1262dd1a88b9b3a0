//! RxJS-style operators

use super::Observable;
use futures::StreamExt;
use futures::stream::select_all;

/// Merge multiple observables
///
/// Values are interleaved in arrival order. The merged observable errors as
/// soon as any source errors, and completes once every source has completed.
///
/// # Example
/// ```no_run
/// # use worker_stream::rx::{Observable, merge};
/// let merged = merge(vec![
///     Observable::from_iter(vec![1, 2]),
///     Observable::from_iter(vec![3, 4]),
/// ]);
/// ```
pub fn merge<T: Send + 'static>(observables: Vec<Observable<T>>) -> Observable<T> {
    let stream = async_stream::stream! {
        let mut merged = select_all(observables.into_iter().map(|o| o.into_stream()));

        while let Some(item) = merged.next().await {
            let failed = item.is_err();
            yield item;
            if failed {
                break;
            }
        }
    };

    Observable::from_stream(stream)
}
