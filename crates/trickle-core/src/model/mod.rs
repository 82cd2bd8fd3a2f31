// Domain model for mirrored resources.

mod descriptor;
mod id;
mod value;

pub use descriptor::{Capabilities, ResourceDescriptor, ResourceKind};
pub use id::ResourceId;
pub use value::FieldValue;
