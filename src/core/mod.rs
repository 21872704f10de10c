//! # Core Application Logic
//!
//! This module contains tripdeck's business logic.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!                    │            CORE              │
//!                    │        (this module)         │
//!                    │                              │
//!                    │  • UiState + StateStore      │
//!                    │  • Command (user intents)    │
//!                    │  • TripController (tasks)    │
//!                    └──────────────┬───────────────┘
//!                                   │
//!            ┌──────────────────────┼──────────────────────┐
//!            ▼                      ▼                      ▼
//!     ┌────────────┐         ┌────────────┐         ┌────────────┐
//!     │    TUI     │         │  Transit   │         │ Preferences│
//!     │  Adapter   │         │  sources   │         │   store    │
//!     │ (ratatui)  │         │ (http/file)│         │   (json)   │
//!     └────────────┘         └────────────┘         └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: `UiState` and the observable `StateStore`
//! - [`action`]: the `Command` enum, everything a user can ask for
//! - [`controller`]: `TripController`, which turns commands into tasks
//! - [`task`]: the preempting navigation slot and the one-shot task kind
//! - [`config`]: settings and their override hierarchy

pub mod action;
pub mod config;
pub mod controller;
pub mod state;
pub mod task;
