pub(crate) mod node;

mod avl;
mod bplus;
mod bst;
mod rb;

pub use avl::AvlTree;
pub use bplus::{BPlusTree, DEFAULT_FANOUT, LeafCursor, MIN_FANOUT, SPLIT_SLACK};
pub use bst::BstTree;
pub use node::BinaryCursor;
pub use rb::{Color, RbTree};
