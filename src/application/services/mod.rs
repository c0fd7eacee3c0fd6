//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the [`KeyValueStore`](crate::infrastructure::traits::KeyValueStore)
//! boundary trait but are themselves concrete structs, not traits.

mod domain;
mod schema;

pub use domain::DomainRepository;
pub use schema::SchemaRegistry;
