mod strategy;
mod registry;

pub use strategy::{BuildStrategy, CommandBuildStrategy, InstallContext};
pub use registry::BuildRegistry;
