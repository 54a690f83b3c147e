pub mod layout;
mod process;
mod reader;

#[cfg(test)]
pub mod mock;

pub use process::*;
pub use reader::{MemoryReader, ReadMemory, f32_at, i32_at, u32_at, u64_at};

#[cfg(test)]
pub use mock::{MockMemoryBuilder, MockMemoryReader, MockProcessProvider};
