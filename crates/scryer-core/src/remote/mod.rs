mod counter;
mod lookup;
mod node;
mod scale;
mod state;
mod tree;

pub use counter::*;
pub use lookup::*;
pub use node::*;
pub use scale::*;
pub use state::*;
pub use tree::*;
