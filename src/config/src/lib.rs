// Copyright 2024 Zinc Labs Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Process-wide configuration for the Flight SQL dispatch core.
//!
//! This is the one knob the spec names (§6 "Configuration: an allocator
//! handle"): a [`MemoryPool`] handlers and the streaming adapter can be
//! built against. Everything else about a concrete server (ports, TLS,
//! persistence) lives outside this crate's scope.

use std::sync::Arc;

use arc_swap::ArcSwap;
use datafusion::execution::memory_pool::{MemoryPool, UnboundedMemoryPool};
use once_cell::sync::Lazy;

/// Process-wide settings. Currently a single field; grows the same way
/// this codebase's other `Config` structs do, as new ambient concerns show
/// up, rather than as a grab bag from day one.
pub struct Settings {
    allocator: Arc<dyn MemoryPool>,
}

impl Settings {
    fn default_settings() -> Self {
        Self {
            allocator: Arc::new(UnboundedMemoryPool::default()),
        }
    }

    /// The allocator handle handlers and the streaming adapter should use
    /// for any buffering they do. Defaults to an unbounded pool so a server
    /// that never calls [`set_settings`] behaves exactly as before this
    /// knob existed.
    pub fn allocator(&self) -> Arc<dyn MemoryPool> {
        self.allocator.clone()
    }
}

static SETTINGS: Lazy<ArcSwap<Settings>> =
    Lazy::new(|| ArcSwap::from_pointee(Settings::default_settings()));

/// Returns the current process-wide settings.
pub fn get_settings() -> Arc<Settings> {
    SETTINGS.load_full()
}

/// Installs a new allocator handle, e.g. so an embedding server can hand
/// the core a memory-pool-aware allocator instead of the default unbounded
/// one. Safe to call at any time; in-flight calls keep using whatever
/// `Arc<Settings>` they already observed.
pub fn set_allocator(allocator: Arc<dyn MemoryPool>) {
    SETTINGS.store(Arc::new(Settings { allocator }));
}
