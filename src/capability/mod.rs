//! Capability module - invocable units offered to reasoning providers
//!
//! Contains capability specs, their builders, capability sets, and the
//! built-in capabilities.

pub mod builtin;
pub mod set;
pub mod spec;

pub use set::CapabilitySet;
pub use spec::{
    CapabilityBuilder, CapabilityDeclaration, CapabilityHandler, CapabilitySpec, FieldBuilder,
    FieldSpec, FnHandler,
};
