mod descriptor;
mod lock;
mod resolver;
mod source;

pub use descriptor::{DescriptorParser, ResourceDescriptor, DEFAULT_REVISION};
pub use lock::BuildLock;
pub use resolver::{ResolvedResource, ResourceResolver};
pub use source::{Git, SourceControl};
