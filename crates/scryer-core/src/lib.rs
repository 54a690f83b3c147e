//! # scryer-core
//!
//! Core library for the Scryer process mirror.
//!
//! This crate attaches to a running target process and exposes a
//! continuously refreshed tree of typed remote objects mirroring the
//! target's internal state. It provides:
//! - Process discovery, attachment and window/foreground tracking
//! - Windows process memory reading behind a mockable OS boundary
//! - Static address recovery via wildcard pattern scanning
//! - A cooperative event scheduler that drives the remote-object tree
//!
//! Nothing here interprets what the mirrored data means; consumers read
//! the tree and the static address table and must tolerate unbound nodes
//! at any time.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod memory;
pub mod pattern;
pub mod process;
pub mod remote;
pub mod sched;

pub use config::{TargetConfig, TargetEntry, create_or_load_config, load_config, save_config};
pub use context::{Core, priority, start_routines};
pub use error::{Error, Result};
pub use events::CoreEvent;
pub use memory::{
    MemoryReader, ProcessHandle, ProcessInfo, ProcessProvider, ReadMemory, WindowId,
    WindowsProvider,
};
pub use pattern::{
    PatternScanner, PatternSet, StaticAddressTable, StaticPattern, builtin_patterns,
    create_or_load_patterns, load_patterns, names, resolve_static_addresses, save_patterns,
};
pub use process::{MonitorDelta, ProcessMonitor, WindowRect};
pub use remote::{ChangeCounter, LookupTable, RemoteNode, RemoteTree, SceneState, StateHub, ViewScale};
pub use sched::{EventScheduler, RoutineFn, RoutineHandle, Signals, Step, Wait};
