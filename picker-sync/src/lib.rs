//! # picker-sync
//!
//! Synchronizes the device-local picker media index with the media items
//! exposed by media-provider backends: always the built-in local provider,
//! and optionally one third-party cloud provider. The result is a single
//! picker database the UI can query without ever contacting the providers
//! directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   PickerSyncController                       │
//! │                                                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐  │
//! │  │   Provider   │  │     Sync     │  │    Paged Sync     │  │
//! │  │   Registry   │  │    Planner   │  │      Engine       │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────┘  │
//! │                                                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐  │
//! │  │  Preferences │  │   Picker DB  │  │      Change       │  │
//! │  │  (user/sync) │  │    Facade    │  │     Notifier      │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//!            │                   │                   │
//!            ▼                   ▼                   ▼
//!     ┌─────────────┐     ┌─────────────┐     ┌───────────┐
//!     │    Local    │     │    Cloud    │     │ Picker UI │
//!     │   Provider  │     │   Provider  │     │ observers │
//!     └─────────────┘     └─────────────┘     └───────────┘
//! ```
//!
//! The controller decides per provider whether an incremental delta sync, a
//! full resync, a reset, or nothing at all is needed, executes the choice
//! through paged provider queries inside atomic resumable write operations,
//! and publishes change notifications as data lands.

pub mod config;
pub mod controller;
pub mod db;
pub mod engine;
pub mod error;
pub mod notify;
pub mod planner;
pub mod prefs;
pub mod registry;

pub use controller::PickerSyncController;
pub use error::SyncError;
