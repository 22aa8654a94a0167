//! Repository traits for ledger operations.

pub mod candidates;
pub mod discoveries;

pub use candidates::CandidateRepo;
pub use discoveries::DiscoveryRepo;
