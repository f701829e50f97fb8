//! Await a state condition with a deadline

use std::time::Duration;

use crate::intent::{Effect, Intent, State};
use crate::store::Store;

/// Suspend until the store's state satisfies `predicate`, or `timeout`
/// elapses.
///
/// The current state is checked immediately: if it already satisfies the
/// predicate, this returns `true` without waiting for a new emission.
/// Returns `false` on timeout, which is a normal outcome rather than an
/// error. Dropping the returned future (cancellation) releases the state
/// subscription.
pub async fn await_state<S, I, E, P>(
    store: &Store<S, I, E>,
    timeout: Duration,
    mut predicate: P,
) -> bool
where
    S: State,
    I: Intent,
    E: Effect,
    P: FnMut(&S) -> bool,
{
    let mut states = store.state_stream();
    tokio::time::timeout(timeout, async move {
        loop {
            let satisfied = {
                let current = states.borrow_and_update();
                predicate(&*current)
            };
            if satisfied {
                return;
            }
            if states.changed().await.is_err() {
                // State channel closed: no further emissions can satisfy
                // the predicate, so wait out the deadline.
                std::future::pending::<()>().await;
            }
        }
    })
    .await
    .is_ok()
}
