use strum::{Display, IntoStaticStr};

/// Events routines suspend on and raise.
///
/// `FrameUpdate` is the per-frame cadence raised by the external driver;
/// everything else originates inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum CoreEvent {
    /// A readable handle to the target process was opened.
    ProcessOpened,
    /// The target process exited or became unreadable.
    ProcessClosed,
    /// The static address table was rebuilt after an attach.
    AddressesResolved,
    /// Per-frame cadence for remote object refreshes.
    FrameUpdate,
    /// The target window gained or lost input focus.
    ForegroundChanged,
    /// The target window moved or was resized.
    WindowMoved,
}
