mod store;

pub use store::{JsonStore, HANGAR_DIR};
