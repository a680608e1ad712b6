// Application layer - Use cases over the backend repository
pub mod dashboard_service;
pub mod meter_repository;
pub mod transform_service;
