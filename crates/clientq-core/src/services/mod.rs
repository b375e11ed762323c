//! Higher-level services shared by clientq interfaces.

mod clients;

pub use clients::ClientDirectory;
