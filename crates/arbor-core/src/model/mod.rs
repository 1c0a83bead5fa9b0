pub mod node;
pub mod patch;
pub mod props;
pub mod state;

pub use node::{Element, Node, Text};
pub use patch::{Patch, Prediction};
pub use props::{collect_props, ElementBuilder, PropertySource};
pub use state::StateChange;
