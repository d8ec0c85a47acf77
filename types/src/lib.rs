pub mod api;
pub mod casino;
pub mod execution;

pub use casino::GameType;
pub use execution::NAMESPACE;
