//! Context wiring: routine registration and the attach/detach cascade.
//!
//! `Core` owns every shared piece of state; routines receive it mutably
//! one at a time from the scheduler, so there is no aliasing to manage.
//! Data flows one direction per tick: monitor -> resolver -> binders ->
//! node refreshes -> consumers.

use tracing::{debug, error, info, warn};

use crate::config::TargetConfig;
use crate::events::CoreEvent;
use crate::memory::{MemoryReader, ProcessProvider, layout::timing};
use crate::pattern::{PatternSet, StaticAddressTable, names, resolve_static_addresses};
use crate::process::ProcessMonitor;
use crate::remote::{RemoteNode, RemoteTree};
use crate::sched::{EventScheduler, RoutineFn, Step, Wait};

/// Routine priorities. Numerically higher runs earlier within a tick:
/// process state before address resolution, resolution before binding,
/// binding before leaf refreshes, parents before children.
pub mod priority {
    pub const PROCESS: i32 = 400;
    pub const RESOLVE: i32 = 300;
    pub const BIND: i32 = 200;
    pub const REFRESH_ROOT: i32 = 120;
    pub const REFRESH_CHILD: i32 = 110;
    pub const REFRESH_LEAF: i32 = 100;
}

/// Everything the routines operate on. One per session, passed explicitly;
/// no ambient globals.
pub struct Core<P: ProcessProvider> {
    pub provider: P,
    pub config: TargetConfig,
    pub patterns: PatternSet,
    pub process: ProcessMonitor,
    pub statics: StaticAddressTable,
    pub tree: RemoteTree,
}

impl<P: ProcessProvider> Core<P> {
    pub fn new(provider: P, config: TargetConfig, patterns: PatternSet) -> Self {
        Self {
            provider,
            config,
            patterns,
            process: ProcessMonitor::new(),
            statics: StaticAddressTable::default(),
            tree: RemoteTree::new(),
        }
    }
}

/// Register the standing routine set.
///
/// The driver raises [`CoreEvent::FrameUpdate`] and ticks the scheduler
/// once per frame; everything else cascades from the monitor's events.
pub fn start_routines<P: ProcessProvider + 'static>(sched: &mut EventScheduler<Core<P>>) {
    sched.start("find and attach", priority::PROCESS, attach_routine());

    sched.start_on(
        "static address resolver",
        priority::RESOLVE,
        CoreEvent::ProcessOpened,
        Box::new(|ctx, signals| {
            let Core {
                provider,
                process,
                patterns,
                statics,
                ..
            } = ctx;
            if let Some(handle) = process.handle() {
                let reader = MemoryReader::new(provider, handle);
                match resolve_static_addresses(&reader, patterns) {
                    Ok(table) => {
                        info!("Resolved {} static addresses", table.len());
                        // Whole-table swap; readers never see it half-built.
                        *statics = table;
                        signals.raise(CoreEvent::AddressesResolved);
                    }
                    Err(e) => warn!("Static address resolution failed: {}", e),
                }
            }
            Step::Yield(Wait::Event(CoreEvent::ProcessOpened))
        }),
    );

    sched.start_on(
        "process closed actions",
        priority::RESOLVE,
        CoreEvent::ProcessClosed,
        Box::new(|ctx, _| {
            ctx.statics.clear();
            ctx.tree.reset_all();
            Step::Yield(Wait::Event(CoreEvent::ProcessClosed))
        }),
    );

    sched.start_on(
        "bind state hub",
        priority::BIND,
        CoreEvent::AddressesResolved,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                statics,
                tree,
                ..
            } = ctx;
            bind_node(&mut tree.state, names::STATE_HUB, statics, provider, process);
            Step::Yield(Wait::Event(CoreEvent::AddressesResolved))
        }),
    );

    sched.start_on(
        "bind change counter",
        priority::BIND,
        CoreEvent::AddressesResolved,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                statics,
                tree,
                ..
            } = ctx;
            bind_node(
                &mut tree.change_counter,
                names::CHANGE_COUNTER,
                statics,
                provider,
                process,
            );
            Step::Yield(Wait::Event(CoreEvent::AddressesResolved))
        }),
    );

    sched.start_on(
        "bind view scale",
        priority::BIND,
        CoreEvent::AddressesResolved,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                statics,
                tree,
                ..
            } = ctx;
            bind_node(&mut tree.view_scale, names::VIEW_SCALE, statics, provider, process);
            Step::Yield(Wait::Event(CoreEvent::AddressesResolved))
        }),
    );

    sched.start_on(
        "bind index table",
        priority::BIND,
        CoreEvent::AddressesResolved,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                statics,
                tree,
                ..
            } = ctx;
            bind_node(&mut tree.index_table, names::INDEX_TABLE, statics, provider, process);
            Step::Yield(Wait::Event(CoreEvent::AddressesResolved))
        }),
    );

    sched.start_on(
        "refresh state hub",
        priority::REFRESH_ROOT,
        CoreEvent::FrameUpdate,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                tree,
                ..
            } = ctx;
            refresh_node(&mut tree.state, "state hub", provider, process);
            Step::Yield(Wait::Event(CoreEvent::FrameUpdate))
        }),
    );

    sched.start_on(
        "refresh scene",
        priority::REFRESH_CHILD,
        CoreEvent::FrameUpdate,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                tree,
                ..
            } = ctx;
            refresh_node(tree.state.scene_mut(), "scene", provider, process);
            Step::Yield(Wait::Event(CoreEvent::FrameUpdate))
        }),
    );

    sched.start_on(
        "refresh scene detail",
        priority::REFRESH_LEAF,
        CoreEvent::FrameUpdate,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                tree,
                ..
            } = ctx;
            refresh_node(
                tree.state.scene_mut().detail_mut(),
                "scene detail",
                provider,
                process,
            );
            Step::Yield(Wait::Event(CoreEvent::FrameUpdate))
        }),
    );

    sched.start_on(
        "refresh change counter",
        priority::REFRESH_LEAF,
        CoreEvent::FrameUpdate,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                tree,
                ..
            } = ctx;
            refresh_node(&mut tree.change_counter, "change counter", provider, process);
            Step::Yield(Wait::Event(CoreEvent::FrameUpdate))
        }),
    );

    sched.start_on(
        "refresh view scale",
        priority::REFRESH_LEAF,
        CoreEvent::FrameUpdate,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                tree,
                ..
            } = ctx;
            refresh_node(&mut tree.view_scale, "view scale", provider, process);
            Step::Yield(Wait::Event(CoreEvent::FrameUpdate))
        }),
    );

    sched.start_on(
        "refresh index table",
        priority::REFRESH_LEAF,
        CoreEvent::FrameUpdate,
        Box::new(|ctx, _| {
            let Core {
                provider,
                process,
                tree,
                ..
            } = ctx;
            refresh_node(&mut tree.index_table, "index table", provider, process);
            Step::Yield(Wait::Event(CoreEvent::FrameUpdate))
        }),
    );
}

/// Attach poller, 1-unit cadence.
///
/// Terminates on success after raising the opened event and spawning the
/// per-tick monitor; terminates without retry on a configuration error.
fn attach_routine<P: ProcessProvider + 'static>() -> RoutineFn<Core<P>> {
    Box::new(|ctx, signals| {
        match ctx.process.try_attach(&ctx.provider, &ctx.config) {
            Ok(true) => {
                signals.raise(CoreEvent::ProcessOpened);
                signals.start("process monitor", priority::PROCESS, monitor_routine());
                Step::Done
            }
            Ok(false) => Step::Yield(Wait::Timer(timing::MONITOR_INTERVAL)),
            Err(e) => {
                // Retrying cannot fix bad configuration; surface it once.
                error!("Attach aborted: {}", e);
                Step::Done
            }
        }
    })
}

/// Per-tick liveness and geometry monitor for the attached process.
fn monitor_routine<P: ProcessProvider + 'static>() -> RoutineFn<Core<P>> {
    Box::new(|ctx, signals| {
        let delta = ctx.process.check(&ctx.provider);
        if delta.closed {
            signals.raise(CoreEvent::ProcessClosed);
            if ctx.config.reattach {
                signals.start("find and attach", priority::PROCESS, attach_routine());
            }
            return Step::Done;
        }
        if delta.foreground_changed {
            signals.raise(CoreEvent::ForegroundChanged);
        }
        if delta.moved {
            signals.raise(CoreEvent::WindowMoved);
        }
        Step::Yield(Wait::Timer(timing::MONITOR_INTERVAL))
    })
}

fn bind_node<P: ProcessProvider, N: RemoteNode>(
    node: &mut N,
    name: &str,
    statics: &StaticAddressTable,
    provider: &P,
    process: &ProcessMonitor,
) {
    let Some(handle) = process.handle() else {
        return;
    };
    let reader = MemoryReader::new(provider, handle);
    match statics.get(name) {
        Ok(address) => {
            if let Err(e) = node.assign(address, &reader) {
                debug!("Initial refresh of '{}' failed: {}", name, e);
            }
        }
        // A missing pattern is a real error for this dependent, not a
        // silent zero.
        Err(e) => error!("Cannot bind '{}': {}", name, e),
    }
}

fn refresh_node<P: ProcessProvider, N: RemoteNode>(
    node: &mut N,
    name: &str,
    provider: &P,
    process: &ProcessMonitor,
) {
    if node.address() == 0 {
        return;
    }
    let Some(handle) = process.handle() else {
        return;
    };
    let reader = MemoryReader::new(provider, handle);
    if let Err(e) = node.refresh(&reader, false) {
        // Transient garbage during loads; keep the last good payload.
        debug!("Refresh of '{}' failed: {}", name, e);
    }
}
