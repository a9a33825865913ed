//! Marker text codec.
//!
//! # Responsibility
//! - Locate and decode timer markers embedded in a single line of text.
//! - Render timer records back into the current compact marker form.
//! - Issue short, process-unique timer ids.
//!
//! # Invariants
//! - Parsing never fails loudly; malformed markers decode to `None`.
//! - Rendering is deterministic and derived only from the record.
//! - Legacy markers are readable forever but never written.

pub mod id;
pub mod marker;

pub use id::{compress_id, expand_id, IdGenerator};
pub use marker::{format_duration, parse, parse_all, render, upgrade_line};
