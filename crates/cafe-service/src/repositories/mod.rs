//! Repository layer for the cafe service.
//!
//! Handlers reach stored drinks only through a repository.

pub mod drinks;

pub use drinks::{DrinkStoreError, DrinksRepository, NewDrink};
