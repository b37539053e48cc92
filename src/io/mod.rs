/// CSV quote sheet export.
pub mod export;
