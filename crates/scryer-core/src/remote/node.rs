//! Base contract for remote objects.

use crate::error::Result;
use crate::memory::ReadMemory;

/// A typed view over a fixed-layout structure in the target process.
///
/// Nodes are constructed unbound (address zero) and live for the whole
/// session. Addresses are assigned from outside: by the address binder for
/// roots, or by the parent node during its own refresh for children; a
/// node never assigns its own address. Payload fields change only inside
/// `refresh`, and `reset` restores the freshly-constructed state.
pub trait RemoteNode {
    fn address(&self) -> u64;

    fn set_address(&mut self, address: u64);

    /// Decode the structure at the current address with exactly one read.
    ///
    /// Only called while bound. On failure the previous payload stays in
    /// place; callers treat the node as unchanged.
    fn refresh<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        address_changed: bool,
    ) -> Result<()>;

    /// Return to the freshly-constructed state: address zero, default
    /// payload. Idempotent.
    fn reset(&mut self);

    /// Address-assignment semantics: zero resets the node, anything else
    /// rebinds it and refreshes immediately.
    fn assign<R: ReadMemory + ?Sized>(&mut self, address: u64, reader: &R) -> Result<()> {
        if address == 0 {
            self.reset();
            return Ok(());
        }
        let changed = address != self.address();
        self.set_address(address);
        self.refresh(reader, changed)
    }
}
