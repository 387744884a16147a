pub mod common;

mod concurrent_reads;
mod expiration_and_cache;
