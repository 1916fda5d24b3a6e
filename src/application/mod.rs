// Application layer - use cases and the chunked data engine
pub mod chunk_fetcher;
pub mod data_repository;
pub mod dataset_service;
pub mod view_stats;
