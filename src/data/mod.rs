pub mod collection;
pub mod store;
