//! The composite state chain: hub -> scene -> detail counter.
//!
//! Parents assign child addresses during their own refresh; children and
//! grandchildren never bind themselves. Each level still refreshes on its
//! own per-frame routine, so a parent only re-points children while the
//! leaves do the frequent decoding.

use crate::error::Result;
use crate::memory::{ReadMemory, f32_at, i32_at, layout, u64_at};
use crate::remote::{ChangeCounter, RemoteNode};

/// Root of the remote tree: the target's central state record.
#[derive(Debug, Default)]
pub struct StateHub {
    address: u64,
    active: i32,
    scene: SceneState,
}

impl StateHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active-state discriminant straight from the target; zero while
    /// unbound or between sessions.
    pub fn active(&self) -> i32 {
        self.active
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub(crate) fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }
}

impl RemoteNode for StateHub {
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
        let data = reader.read_bytes(self.address, layout::state_hub::SIZE)?;
        let scene_ptr = u64_at(&data, layout::state_hub::SCENE_PTR);
        let active = i32_at(&data, layout::state_hub::ACTIVE);

        if active != self.active {
            self.active = active;
        }
        self.scene.assign(scene_ptr, reader)
    }

    fn reset(&mut self) {
        self.address = 0;
        self.active = 0;
        self.scene.reset();
    }
}

/// The live scene record, child of [`StateHub`].
#[derive(Debug, Default)]
pub struct SceneState {
    address: u64,
    origin: [f32; 3],
    detail: ChangeCounter,
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// World-space origin of the scene.
    pub fn origin(&self) -> [f32; 3] {
        self.origin
    }

    pub fn detail(&self) -> &ChangeCounter {
        &self.detail
    }

    pub(crate) fn detail_mut(&mut self) -> &mut ChangeCounter {
        &mut self.detail
    }
}

impl RemoteNode for SceneState {
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
        let data = reader.read_bytes(self.address, layout::scene::SIZE)?;
        self.origin = [
            f32_at(&data, layout::scene::ORIGIN_X),
            f32_at(&data, layout::scene::ORIGIN_Y),
            f32_at(&data, layout::scene::ORIGIN_Z),
        ];
        let detail_ptr = u64_at(&data, layout::scene::DETAIL_PTR);
        self.detail.assign(detail_ptr, reader)
    }

    fn reset(&mut self) {
        self.address = 0;
        self.origin = [0.0; 3];
        self.detail.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MockMemoryBuilder, MockMemoryReader};

    const HUB: u64 = 0x5000;
    const SCENE: u64 = 0x6000;
    const DETAIL: u64 = 0x7000;

    fn image() -> MockMemoryReader {
        MockMemoryBuilder::new(0x4000)
            .pad_to(0x4000)
            .write_u64(HUB + layout::state_hub::SCENE_PTR as u64, SCENE)
            .write_i32(HUB + layout::state_hub::ACTIVE as u64, 3)
            .write_f32(SCENE + layout::scene::ORIGIN_X as u64, 1.0)
            .write_f32(SCENE + layout::scene::ORIGIN_Y as u64, 2.0)
            .write_f32(SCENE + layout::scene::ORIGIN_Z as u64, 3.0)
            .write_u64(SCENE + layout::scene::DETAIL_PTR as u64, DETAIL)
            .write_u32(DETAIL, 99)
            .build()
    }

    #[test]
    fn test_refresh_cascades_addresses_down_the_chain() {
        let reader = image();
        let mut hub = StateHub::new();
        hub.assign(HUB, &reader).unwrap();

        assert_eq!(hub.active(), 3);
        assert_eq!(hub.scene().address(), SCENE);
        assert_eq!(hub.scene().origin(), [1.0, 2.0, 3.0]);
        assert_eq!(hub.scene().detail().address(), DETAIL);
        assert_eq!(hub.scene().detail().value(), 99);
    }

    #[test]
    fn test_null_child_pointer_resets_child_only() {
        let mut reader = image();
        let mut hub = StateHub::new();
        hub.assign(HUB, &reader).unwrap();

        // Target swaps the scene out: pointer goes null mid-session.
        reader.poke(HUB + layout::state_hub::SCENE_PTR as u64, &0u64.to_le_bytes());
        hub.refresh(&reader, false).unwrap();

        assert_eq!(hub.active(), 3);
        assert_eq!(hub.scene().address(), 0);
        assert_eq!(hub.scene().origin(), [0.0; 3]);
        assert_eq!(hub.scene().detail().value(), 0);
    }

    #[test]
    fn test_reset_is_deep_and_idempotent() {
        let reader = image();
        let mut hub = StateHub::new();
        hub.assign(HUB, &reader).unwrap();

        hub.reset();
        hub.reset();
        assert_eq!(hub.address(), 0);
        assert_eq!(hub.active(), 0);
        assert_eq!(hub.scene().address(), 0);
        assert_eq!(hub.scene().detail().address(), 0);
    }

    #[test]
    fn test_garbage_scene_pointer_fails_without_clobbering_hub() {
        let mut reader = image();
        let mut hub = StateHub::new();
        hub.assign(HUB, &reader).unwrap();

        // Transient garbage during a load screen.
        reader.poke(
            HUB + layout::state_hub::SCENE_PTR as u64,
            &0xDEAD_0000u64.to_le_bytes(),
        );
        assert!(hub.refresh(&reader, false).is_err());

        // Hub scalars from the successful part of the pass survive and the
        // old scene payload is still visible.
        assert_eq!(hub.active(), 3);
        assert_eq!(hub.scene().origin(), [1.0, 2.0, 3.0]);
    }
}
