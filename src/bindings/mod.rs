//! Language bindings for fmvars
//!
//! This module contains bindings for embedding fmvars in other runtimes.

// WebAssembly support (also compiled for native tests)
#[cfg(any(target_arch = "wasm32", test))]
pub mod wasm;
