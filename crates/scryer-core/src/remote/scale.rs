use crate::error::Result;
use crate::memory::{ReadMemory, f32_at, layout};
use crate::remote::RemoteNode;

/// The target's view scale factors, four packed floats.
///
/// Consumers map target-space coordinates into window space with these;
/// the neutral value is 1.0, which is also the reset state.
#[derive(Debug)]
pub struct ViewScale {
    address: u64,
    values: [f32; layout::view_scale::COUNT],
}

impl Default for ViewScale {
    fn default() -> Self {
        Self {
            address: 0,
            values: [1.0; layout::view_scale::COUNT],
        }
    }
}

impl ViewScale {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &[f32; layout::view_scale::COUNT] {
        &self.values
    }
}

impl RemoteNode for ViewScale {
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
        let data = reader.read_bytes(self.address, layout::view_scale::SIZE)?;
        for (index, value) in self.values.iter_mut().enumerate() {
            *value = f32_at(&data, index * layout::view_scale::WORD);
        }
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    #[test]
    fn test_refresh_decodes_all_values() {
        let reader = MockMemoryBuilder::new(0x2000)
            .write_f32(0x2000, 0.5)
            .write_f32(0x2004, 1.25)
            .write_f32(0x2008, 2.0)
            .write_f32(0x200C, 4.0)
            .build();
        let mut scale = ViewScale::new();
        scale.assign(0x2000, &reader).unwrap();
        assert_eq!(scale.values(), &[0.5, 1.25, 2.0, 4.0]);
    }

    #[test]
    fn test_reset_restores_neutral_scale() {
        let reader = MockMemoryBuilder::new(0x2000)
            .write_f32(0x2000, 0.5)
            .write_f32(0x2004, 0.5)
            .write_f32(0x2008, 0.5)
            .write_f32(0x200C, 0.5)
            .build();
        let mut scale = ViewScale::new();
        scale.assign(0x2000, &reader).unwrap();

        scale.reset();
        assert_eq!(scale.address(), 0);
        assert_eq!(scale.values(), ViewScale::new().values());
    }
}
