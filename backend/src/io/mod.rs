//! # IO Module
//!
//! Adapter layer between HTTP clients and the domain services. Only the REST
//! interface exists today.

pub mod rest;

pub use rest::api_routes;
