// Pipeline processing: cleaning, recency filtering, derivation and validation

pub mod clean;
pub mod enrich;
pub mod quality_gate;
pub mod recency;
