//! Invocation context.
//!
//! A bound function whose first parameter is a [`Context`] receives the
//! context passed to the invocation; the parameter is not matched against
//! the arguments struct. The library itself never inspects the context, so
//! request-scoped values and cancellation are entirely up to the caller and
//! the function.
//!
//! ```rust
//! use cmdbind::Context;
//!
//! struct RequestId(u64);
//!
//! let ctx = Context::new().with_value(RequestId(7));
//! assert_eq!(ctx.value::<RequestId>().map(|r| r.0), Some(7));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Type-keyed values carried by a [`Context`].
///
/// At most one value per type is stored. Values are shared, so cloning the
/// container is cheap and a clone sees the same values.
#[derive(Clone, Default)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) {
        self.map.insert(TypeId::of::<T>(), Arc::new(val));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Gets a value that the caller requires to be present.
    pub fn get_required<T: Send + Sync + 'static>(&self) -> Result<&T, anyhow::Error> {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "context value missing: type {} not found",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> bool {
        self.map.remove(&TypeId::of::<T>()).is_some()
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}

/// Context handed to bound functions that declare it as first parameter.
///
/// Clones share the cancellation flag. [`Context::with_value`] derives a
/// child context with an extra value; the child shares the parent's
/// cancellation flag.
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<Extensions>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a child context that additionally carries `val`.
    pub fn with_value<T: Send + Sync + 'static>(&self, val: T) -> Self {
        let mut values = (*self.values).clone();
        values.insert(val);
        Context {
            values: Arc::new(values),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn value<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get::<T>()
    }

    pub fn value_required<T: Send + Sync + 'static>(&self) -> Result<&T, anyhow::Error> {
        self.values.get_required::<T>()
    }

    pub fn values(&self) -> &Extensions {
        &self.values
    }

    /// Marks this context and every clone of it as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.values)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
