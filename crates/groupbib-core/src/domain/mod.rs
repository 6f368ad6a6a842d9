//! Domain models for the group bibliography

mod author;
mod publication;

pub use author::Author;
pub use publication::{Publication, PublicationType};
