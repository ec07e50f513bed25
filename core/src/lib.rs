//! Bill triage core — consequence-based bill prioritisation and crisis
//! cash allocation.
//!
//! The scorer, the triage allocator and the consequence timeline are pure
//! functions of their inputs and an explicit `now`. `engine` wires them to
//! a `store::BillRepository` and an injected `clock::Clock`.

pub mod bill;
pub mod clock;
pub mod config;
pub mod consequence;
pub mod engine;
pub mod error;
pub mod priority;
pub mod rng;
pub mod runway;
pub mod sample;
pub mod store;
pub mod timeline;
pub mod triage;
pub mod types;
