// Library root - layered as domain, application, infrastructure, presentation
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
