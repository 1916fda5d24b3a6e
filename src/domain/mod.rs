// Domain layer - pure types and algorithms
pub mod chunk;
pub mod granularity;
pub mod query;
pub mod records;
pub mod scale;
pub mod stats;
