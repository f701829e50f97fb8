//! Shortcut registrations and transform sugar
//!
//! Everything here is syntactic sugar over `IntentBuilder::setup`/`listen`
//! and `HandlerBuilder::transform`; no new semantics.

use std::future::Future;
use std::time::Duration;

use tokio_stream::Stream;

use crate::builder::IntentBuilder;
use crate::error::HandlerError;
use crate::handler::HandlerBuilder;
use crate::intent::{Effect, Intent, State, SubIntent};
use crate::store::Store;
use crate::transform;

impl<S: State, I: Intent, E: Effect> IntentBuilder<S, I, E> {
    /// Register a serial handler for intents matching `T`.
    pub fn on<T, F, Fut>(&mut self, action: F) -> &mut Self
    where
        T: SubIntent<I>,
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.setup::<T, _>(|handler| {
            handler.serial(action);
        })
    }

    /// Register a serial handler guarded by a condition.
    ///
    /// A `false` condition still registers the handler; matching intents
    /// are filtered to the type and then unconditionally discarded. The
    /// sub-stream subscription exists either way.
    pub fn on_if<T, F, Fut>(&mut self, condition: bool, action: F) -> &mut Self
    where
        T: SubIntent<I>,
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.setup::<T, _>(|handler| {
            if !condition {
                handler.filter(|_| false);
            }
            handler.serial(action);
        })
    }

    /// Register a latest-wins handler for intents matching `T`.
    pub fn on_latest<T, F, Fut>(&mut self, action: F) -> &mut Self
    where
        T: SubIntent<I>,
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.setup::<T, _>(|handler| {
            handler.latest(action);
        })
    }

    /// Register a concurrent handler for intents matching `T`.
    pub fn on_parallel<T, F, Fut>(&mut self, action: F) -> &mut Self
    where
        T: SubIntent<I>,
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.setup::<T, _>(|handler| {
            handler.concurrent(action);
        })
    }

    /// Register a drop-while-busy handler for intents matching `T`.
    pub fn on_single<T, F, Fut>(&mut self, action: F) -> &mut Self
    where
        T: SubIntent<I>,
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.setup::<T, _>(|handler| {
            handler.dropping(action);
        })
    }

    /// Register a serial handler on an external stream.
    pub fn listen_serial<St, T, F, Fut>(&mut self, source: St, action: F) -> &mut Self
    where
        St: Stream<Item = T> + Send + 'static,
        T: Send + 'static,
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.listen(source, |handler| {
            handler.serial(action);
        })
    }

    /// Register a latest-wins handler on an external stream.
    pub fn listen_latest<St, T, F, Fut>(&mut self, source: St, action: F) -> &mut Self
    where
        St: Stream<Item = T> + Send + 'static,
        T: Send + 'static,
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.listen(source, |handler| {
            handler.latest(action);
        })
    }

    /// Register a concurrent handler on an external stream.
    pub fn listen_parallel<St, T, F, Fut>(&mut self, source: St, action: F) -> &mut Self
    where
        St: Stream<Item = T> + Send + 'static,
        T: Send + 'static,
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.listen(source, |handler| {
            handler.concurrent(action);
        })
    }

    /// Register a drop-while-busy handler on an external stream.
    pub fn listen_single<St, T, F, Fut>(&mut self, source: St, action: F) -> &mut Self
    where
        St: Stream<Item = T> + Send + 'static,
        T: Send + 'static,
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.listen(source, |handler| {
            handler.dropping(action);
        })
    }
}

impl<T, S, I, E> HandlerBuilder<T, S, I, E>
where
    T: Send + 'static,
    S: State,
    I: Intent,
    E: Effect,
{
    /// Debounce the upstream: only the latest event survives a quiet window.
    pub fn debounce(&mut self, quiet: Duration) -> &mut Self
    where
        T: Unpin,
    {
        self.transform(transform::debounce(quiet))
    }

    /// Suppress consecutive duplicate events.
    pub fn distinct(&mut self) -> &mut Self
    where
        T: PartialEq + Clone,
    {
        self.transform(transform::distinct())
    }

    /// Keep only events matching the predicate.
    pub fn filter<P>(&mut self, predicate: P) -> &mut Self
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        self.transform(transform::filter(predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    #[derive(Clone, Debug, PartialEq)]
    struct TestState(i64);
    impl State for TestState {}

    #[derive(Clone, Debug, PartialEq)]
    enum TestIntent {
        Add(i64),
        Query(&'static str),
    }
    impl Intent for TestIntent {}

    #[derive(Clone, Debug, PartialEq)]
    struct Query(&'static str);
    impl SubIntent<TestIntent> for Query {
        fn extract(intent: TestIntent) -> Option<Self> {
            match intent {
                TestIntent::Query(s) => Some(Query(s)),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone)]
    enum TestEffect {}
    impl Effect for TestEffect {}

    type TestStore = Store<TestState, TestIntent, TestEffect>;

    #[tokio::test]
    async fn test_on_mutates_state_through_store_handle() {
        let store: TestStore = Store::new(StoreConfig::new(
            || TestState(0),
            |_, intents| {
                intents.on(|store: TestStore, intent: TestIntent| async move {
                    if let TestIntent::Add(n) = intent {
                        store.mutate_state(|TestState(total)| TestState(total + n));
                    }
                    Ok(())
                });
            },
        ));

        store.dispatch(TestIntent::Add(2));
        store.dispatch(TestIntent::Add(3));

        assert!(
            crate::wait::await_state(&store, Duration::from_millis(500), |TestState(n)| *n == 5)
                .await
        );
    }

    #[tokio::test]
    async fn test_on_if_false_registers_but_discards() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let store: TestStore = Store::new(StoreConfig::new(
            || TestState(0),
            move |_, intents| {
                let log = log.clone();
                intents.on_if(false, move |_store: TestStore, Query(s)| {
                    let log = log.clone();
                    async move {
                        log.lock().unwrap().push(s);
                        Ok(())
                    }
                });
            },
        ));

        store.dispatch(TestIntent::Query("ignored"));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_debounce_on_handler_keeps_last_query() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let store: TestStore = Store::new(StoreConfig::new(
            || TestState(0),
            move |_, intents| {
                let log = log.clone();
                intents.setup::<Query, _>(move |handler| {
                    handler.debounce(Duration::from_millis(40)).distinct();
                    handler.serial(move |_store, Query(s)| {
                        let log = log.clone();
                        async move {
                            log.lock().unwrap().push(s);
                            Ok(())
                        }
                    });
                });
            },
        ));

        store.dispatch(TestIntent::Query("h"));
        store.dispatch(TestIntent::Query("he"));
        store.dispatch(TestIntent::Query("hel"));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(seen.lock().unwrap().clone(), vec!["hel"]);
    }

    #[tokio::test]
    async fn test_listen_latest_supersedes_slow_work() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::unbounded_channel::<&'static str>();
        let log = seen.clone();
        let source = Mutex::new(Some(UnboundedReceiverStream::new(rx)));
        let store: TestStore = Store::new(StoreConfig::new(
            || TestState(0),
            move |_, intents| {
                let source = source.lock().unwrap().take().expect("setup ran twice");
                let log = log.clone();
                intents.listen_latest(source, move |_store: TestStore, event| {
                    let log = log.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(60)).await;
                        log.lock().unwrap().push(event);
                        Ok(())
                    }
                });
            },
        ));

        let _ = store.get_state();
        tx.send("stale").expect("send");
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send("fresh").expect("send");
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(seen.lock().unwrap().clone(), vec!["fresh"]);
    }
}
