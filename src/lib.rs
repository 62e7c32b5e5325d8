//! A demo Electronic Medical Records API.
//!
//! Patients, medicines, appointments and prescriptions live in an in-memory
//! [`MemoryStore`] that checks foreign keys on every write. The schema mapper
//! ([`map_schema`]) describes the tables of an external PostgreSQL database
//! through the [`Catalog`] adapter.

pub mod libs;

pub use libs::*;
