pub mod sandbox;

pub use sandbox::{PathSandbox, ResolvedPath};
