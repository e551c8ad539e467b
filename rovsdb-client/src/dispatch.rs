//! Method dispatch for the callee role.
//!
//! Inbound requests are routed through an explicit registration table:
//! method name to handler function, each with a declared parameter-count
//! contract. The table is built once, before the engine starts, and never
//! mutated afterwards, so lookups take no lock.

use crate::error::ClientError;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Parameter-count contract of one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Leading parameters the handler requires.
    pub required: usize,
    /// Whether parameters past `required` are accepted as a variadic tail.
    pub variadic: bool,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self {
            required: n,
            variadic: false,
        }
    }

    pub const fn at_least(n: usize) -> Self {
        Self {
            required: n,
            variadic: true,
        }
    }

    fn admits(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.required
        } else {
            count == self.required
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variadic {
            write!(f, "at least {}", self.required)
        } else {
            write!(f, "exactly {}", self.required)
        }
    }
}

/// A handler takes the positional parameters and either produces the
/// response's result value or an error message for its error field.
pub type HandlerFn = Arc<dyn Fn(Vec<Json>) -> Result<Json, String> + Send + Sync>;

struct Handler {
    arity: Arity,
    func: HandlerFn,
}

impl Handler {
    fn invoke(&self, params: Vec<Json>) -> Result<Json, String> {
        if !self.arity.admits(params.len()) {
            return Err(format!(
                "expected {} parameters, got {}",
                self.arity,
                params.len()
            ));
        }
        (self.func)(params)
    }
}

/// Method-name to handler registry.
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. A second registration for the same method name
    /// is a configuration error, raised here rather than at call time.
    pub fn register<F>(
        &mut self,
        method: impl Into<String>,
        arity: Arity,
        func: F,
    ) -> Result<(), ClientError>
    where
        F: Fn(Vec<Json>) -> Result<Json, String> + Send + Sync + 'static,
    {
        match self.handlers.entry(method.into()) {
            Entry::Occupied(entry) => Err(ClientError::HandlerExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(Handler {
                    arity,
                    func: Arc::new(func),
                });
                Ok(())
            }
        }
    }

    /// Dispatches to the registered handler; `None` means unknown method.
    /// Arity is enforced before the handler body runs, so handlers may
    /// index their required parameters directly.
    pub fn dispatch(&self, method: &str, params: Vec<Json>) -> Option<Result<Json, String>> {
        self.handlers.get(method).map(|h| h.invoke(params))
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

/// Decodes the positional parameter at `index` into the declared type.
pub fn param<T: DeserializeOwned>(params: &[Json], index: usize) -> Result<T, String> {
    let value = params
        .get(index)
        .ok_or_else(|| format!("missing parameter {index}"))?;
    serde_json::from_value(value.clone()).map_err(|e| format!("parameter {index}: {e}"))
}

/// Decodes every parameter from `index` onward as a variadic tail,
/// converting each element individually.
pub fn variadic<T: DeserializeOwned>(params: &[Json], index: usize) -> Result<Vec<T>, String> {
    params
        .iter()
        .skip(index)
        .enumerate()
        .map(|(offset, value)| {
            serde_json::from_value(value.clone())
                .map_err(|e| format!("parameter {}: {e}", index + offset))
        })
        .collect()
}
