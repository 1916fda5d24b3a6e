// Library root - layered modules shared by the binary and tests
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
