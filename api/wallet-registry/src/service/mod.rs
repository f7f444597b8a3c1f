pub mod validation_service;
