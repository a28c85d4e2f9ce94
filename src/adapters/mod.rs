// Adapters layer: concrete implementations of the domain ports for the remote services.

pub mod datastore;
pub mod feature_service;
pub mod http;
