//! Exquisite Types - Pure type definitions
//!
//! This crate contains only plain data types with no runtime or storage
//! dependencies, shared by the core library and the server.

pub mod entity;

pub use entity::*;
