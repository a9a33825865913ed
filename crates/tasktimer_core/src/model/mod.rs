//! Timer domain model shared by codec, accounting and runtime layers.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep document text as the persisted source of truth for timer state.
//!
//! # Invariants
//! - Every timer is identified by a process-unique `TimerId`.
//! - A timer exists only while its marker text exists in some document.

pub mod document;
pub mod session;
pub mod timer;
