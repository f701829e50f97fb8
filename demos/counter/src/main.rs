//! Counter - Minimal mvi-dispatch example
//!
//! This example demonstrates the core pattern in ~100 lines:
//! - State: What the feature knows
//! - Intents: What can happen
//! - Handlers: How state changes (and where effects come from)
//! - Store: Where state lives
//!
//! Run with `RUST_LOG=debug` to watch the logging middleware narrate the
//! flow: intent in, state transition, effect out.

use std::time::Duration;

use mvi_dispatch::prelude::*;
use mvi_dispatch::SubIntent;

// ============================================================================
// State - What the feature knows
// ============================================================================

#[derive(Clone, Debug, PartialEq, Default)]
struct CounterState {
    count: i64,
}
impl State for CounterState {}

// ============================================================================
// Intents - What can happen
// ============================================================================

#[derive(Clone, Debug)]
enum CounterIntent {
    Add(i64),
    Reset,
}
impl Intent for CounterIntent {
    fn name(&self) -> &'static str {
        match self {
            CounterIntent::Add(_) => "Add",
            CounterIntent::Reset => "Reset",
        }
    }
}

#[derive(Clone, Debug)]
struct Add(i64);
impl SubIntent<CounterIntent> for Add {
    fn extract(intent: CounterIntent) -> Option<Self> {
        match intent {
            CounterIntent::Add(n) => Some(Add(n)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct Reset;
impl SubIntent<CounterIntent> for Reset {
    fn extract(intent: CounterIntent) -> Option<Self> {
        match intent {
            CounterIntent::Reset => Some(Reset),
            _ => None,
        }
    }
}

// ============================================================================
// Effects - One-off notifications
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum CounterEffect {
    WasReset { previous: i64 },
}
impl Effect for CounterEffect {}

type CounterStore = Store<CounterState, CounterIntent, CounterEffect>;

// ============================================================================
// Main - Wire the store, dispatch, observe
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store: CounterStore = Store::new(StoreConfig::new(CounterState::default, |_, intents| {
        intents.install(LoggingMiddleware::verbose());

        intents.on(|store: CounterStore, Add(n)| async move {
            store.mutate_state(|state| CounterState {
                count: state.count + n,
            });
            Ok(())
        });

        intents.on(|store: CounterStore, _reset: Reset| async move {
            let previous = store.get_state().count;
            store.mutate_state(|_| CounterState::default());
            store.emit_effect(move || CounterEffect::WasReset { previous });
            Ok(())
        });
    }));

    let mut effects = match store.take_effects() {
        Some(rx) => rx,
        None => unreachable!("effects claimed once, right here"),
    };

    store.dispatch(CounterIntent::Add(2));
    store.dispatch(CounterIntent::Add(40));

    let reached = await_state(&store, Duration::from_secs(1), |state: &CounterState| {
        state.count == 42
    })
    .await;
    println!("count reached 42: {reached}");

    store.dispatch(CounterIntent::Reset);
    if let Ok(Some(effect)) =
        tokio::time::timeout(Duration::from_secs(1), effects.recv()).await
    {
        println!("effect: {effect:?}");
    }

    println!("final count: {}", store.get_state().count);
    store.shutdown();
}
