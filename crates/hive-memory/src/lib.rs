//! Durable shared state carried between pipeline steps.

pub mod store;

pub use store::SharedStateStore;
