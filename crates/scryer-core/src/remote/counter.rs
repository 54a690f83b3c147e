use crate::error::Result;
use crate::memory::ReadMemory;
use crate::remote::RemoteNode;

/// A single counter cell the target bumps on internal transitions.
///
/// The value carries no meaning here; consumers compare successive reads
/// to detect that something changed.
#[derive(Debug, Default)]
pub struct ChangeCounter {
    address: u64,
    value: u32,
}

impl ChangeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

impl RemoteNode for ChangeCounter {
    fn address(&self) -> u64 {
        self.address
    }

    fn set_address(&mut self, address: u64) {
        self.address = address;
    }

    fn refresh<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        _address_changed: bool,
    ) -> Result<()> {
        let value = reader.read_u32(self.address)?;
        if value != self.value {
            self.value = value;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.address = 0;
        self.value = 0;
    }
}
