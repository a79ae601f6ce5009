//! Wire types shared by the Buddy Brno crates: enums, token claims,
//! request/response documents and their field validation.

pub mod api;
pub mod models;
pub mod validation;
