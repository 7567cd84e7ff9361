// Application layer - Widget compilation and dashboard use cases
pub mod dashboard_repository;
pub mod dashboard_service;
pub mod errors;
pub mod native_filters;
pub mod normalizer;
pub mod validator;

#[cfg(test)]
pub mod testing;
