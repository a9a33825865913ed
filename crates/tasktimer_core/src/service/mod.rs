//! Timer use-case services.
//!
//! # Responsibility
//! - Orchestrate codec, accounting and runtime state into user-level actions.
//! - Keep host integrations decoupled from marker and registry details.

pub mod checkbox_bridge;
pub mod session_controller;
pub mod timer_service;

pub use checkbox_bridge::{BridgeIntent, BridgeOutcome, TextChange};
pub use session_controller::{OpenReport, RestoreDecision, SessionController};
pub use timer_service::{
    MenuAction, ServiceResult, TickOutcome, TimerOutcome, TimerService, TimerServiceError,
};
