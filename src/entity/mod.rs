pub mod helpers;
pub mod people;
pub mod relationships;
