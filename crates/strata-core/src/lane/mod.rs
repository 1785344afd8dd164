// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Lane abstraction
//!
//! A **lane** is a swappable processing strategy driven once per frame by its
//! owner. The clustered lighting pipeline is one; the trait keeps the owner
//! ignorant of which strategy runs.
//!
//! Lifecycle:
//!
//! ```text
//! on_initialize(ctx)  ->  [ execute(ctx) ]*  ->  on_shutdown(ctx)
//! ```
//!
//! Every call receives a [`LaneContext`], a type map the owner fills with what
//! the lane needs (a device, an encoder, a camera) and the lane may write its
//! outputs back into (see [`context_keys`]).
//!
//! ```rust,ignore
//! use strata_core::lane::{Lane, LaneContext, LaneError, LaneKind};
//!
//! struct Noop;
//!
//! impl Lane for Noop {
//!     fn strategy_name(&self) -> &'static str { "Noop" }
//!     fn lane_kind(&self) -> LaneKind { LaneKind::Compute }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

pub mod context_keys;
pub use context_keys::*;

/// Error type for lane operations.
#[derive(Debug)]
pub enum LaneError {
    /// The lane was executed before `on_initialize` succeeded.
    NotInitialized,
    /// A value the lane needs is missing from the [`LaneContext`].
    InvalidContext {
        /// What the lane expected.
        expected: &'static str,
        /// Description of what was received.
        received: String,
    },
    /// A domain error occurred during execution.
    ExecutionFailed(Box<dyn std::error::Error + Send + Sync>),
    /// A domain error occurred during initialization.
    InitializationFailed(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneError::NotInitialized => write!(f, "Lane not initialized"),
            LaneError::InvalidContext { expected, received } => {
                write!(f, "Invalid lane context: expected {expected}, got {received}")
            }
            LaneError::ExecutionFailed(e) => write!(f, "Lane execution failed: {e}"),
            LaneError::InitializationFailed(e) => write!(f, "Lane initialization failed: {e}"),
        }
    }
}

impl std::error::Error for LaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaneError::ExecutionFailed(e) | LaneError::InitializationFailed(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl LaneError {
    /// A context entry of type `type_name` was not found.
    pub fn missing(type_name: &'static str) -> Self {
        LaneError::InvalidContext {
            expected: type_name,
            received: "not found in LaneContext".into(),
        }
    }
}

/// Classification of lanes, used by owners to route them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Work recorded as part of the frame's rendering.
    Render,
    /// Standalone compute work.
    Compute,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::Render => write!(f, "Render"),
            LaneKind::Compute => write!(f, "Compute"),
        }
    }
}

/// A type-erased context for passing data to lanes, keyed by type.
///
/// ```
/// use strata_core::lane::{LaneContext, RenderTargetSize};
///
/// let mut ctx = LaneContext::new();
/// ctx.insert(RenderTargetSize { width: 1920, height: 1080 });
///
/// assert_eq!(ctx.get::<RenderTargetSize>().map(|s| s.width), Some(1920));
/// assert!(!ctx.contains::<u32>());
/// ```
///
/// Borrowed data goes through the [`Slot`] (mutable) and [`Ref`] (shared)
/// wrappers. Those hold raw pointers, which is why the context is manually
/// `Send + Sync`: it is built by the owner for a single frame, handed to one
/// lane at a time and dropped before the borrowed data goes away.
pub struct LaneContext {
    data: HashMap<TypeId, Box<dyn Any>>,
}

// SAFETY: `insert` only accepts `Send + Sync` values. Slot/Ref are confined to
// the frame that created them.
unsafe impl Send for LaneContext {}
unsafe impl Sync for LaneContext {}

impl LaneContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Inserts a value, replacing any previous value of the same type.
    pub fn insert<T: 'static + Send + Sync>(&mut self, value: T) {
        self.data.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Shared reference to the value of type `T`.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.data.get(&TypeId::of::<T>())?.downcast_ref()
    }

    /// Mutable reference to the value of type `T`.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.data.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    /// Whether a value of type `T` is present.
    pub fn contains<T: 'static>(&self) -> bool {
        self.data.contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns the value of type `T`.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.data
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast().ok().map(|b| *b))
    }
}

impl Default for LaneContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LaneContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaneContext")
            .field("entries", &self.data.len())
            .finish()
    }
}

/// Wraps a **mutable** borrow so it can live in a [`LaneContext`].
///
/// The lifetime is erased; the owner must drop the context before the borrow ends.
pub struct Slot<T: ?Sized>(*mut T);

// SAFETY: confined to the frame that created it.
unsafe impl<T: ?Sized> Send for Slot<T> {}
unsafe impl<T: ?Sized> Sync for Slot<T> {}

impl<T: ?Sized> Slot<T> {
    /// Creates a `Slot` from a mutable reference.
    pub fn new(value: &mut T) -> Self {
        Self(value as *mut T)
    }

    /// The wrapped value, mutably.
    #[allow(clippy::mut_from_ref)]
    pub fn get(&self) -> &mut T {
        // SAFETY: the borrow outlives the context and lanes run one at a time.
        unsafe { &mut *self.0 }
    }

    /// The wrapped value, shared.
    pub fn get_ref(&self) -> &T {
        // SAFETY: as for `get`.
        unsafe { &*self.0 }
    }
}

/// Wraps a **shared** borrow so it can live in a [`LaneContext`].
pub struct Ref<T: ?Sized>(*const T);

// SAFETY: confined to the frame that created it.
unsafe impl<T: ?Sized> Send for Ref<T> {}
unsafe impl<T: ?Sized> Sync for Ref<T> {}

impl<T: ?Sized> Ref<T> {
    /// Creates a `Ref` from a shared reference.
    pub fn new(value: &T) -> Self {
        Self(value as *const T)
    }

    /// The wrapped value.
    pub fn get(&self) -> &T {
        // SAFETY: the borrow outlives the context.
        unsafe { &*self.0 }
    }
}

/// Base trait of every lane.
///
/// Methods take `&self`: lanes keep their GPU state behind interior
/// mutability so an owner can hold them as `Box<dyn Lane>` and share them.
pub trait Lane: Send + Sync {
    /// Name of the strategy, used in logs.
    fn strategy_name(&self) -> &'static str;

    /// What kind of work the lane performs.
    fn lane_kind(&self) -> LaneKind;

    /// Relative cost of running the lane this frame. Defaults to `1.0`.
    fn estimate_cost(&self, _ctx: &LaneContext) -> f32 {
        1.0
    }

    /// Creates the lane's GPU state. Called once before the first `execute`.
    fn on_initialize(&self, _ctx: &mut LaneContext) -> Result<(), LaneError> {
        Ok(())
    }

    /// Records the lane's work for one frame.
    fn execute(&self, _ctx: &mut LaneContext) -> Result<(), LaneError> {
        Ok(())
    }

    /// Releases the lane's GPU state.
    fn on_shutdown(&self, _ctx: &mut LaneContext) {}

    /// Downcast to the concrete lane.
    fn as_any(&self) -> &dyn Any;

    /// Downcast to the concrete lane, mutably.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
