//! Business logic services

pub mod entity_service;
pub mod seeder;

pub use entity_service::{EntityService, ListOptions, NewEntity};
pub use seeder::spawn_seeding;
