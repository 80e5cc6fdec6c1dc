//! Package version selection from command-line input
//!
//! - **version**: structured version parsing and ordering
//! - **key**: case-insensitive (step or package, reference) lookup keys
//! - **resolver**: the version specifier store and its precedence rules
//! - **folder**: discovering versions from a folder of package archives

pub mod folder;
pub mod key;
pub mod resolver;
pub mod version;

pub use resolver::PackageVersionResolver;
pub use version::PackageVersion;
