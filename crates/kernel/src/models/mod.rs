//! Content models shared between the kernel and its host adapters.

pub mod item;
pub mod menu_link;

pub use item::{Item, ItemStatus, ListingQuery};
pub use menu_link::MenuLink;
