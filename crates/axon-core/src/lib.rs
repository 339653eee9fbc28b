//! Axon Core - Core types for the Axon hub client runtime
//!
//! This crate provides the foundational types for the Axon system:
//! - Hardware identifiers and function keys for addressing device functions
//! - Generic attribute values with the documented invalid sentinels
//! - Attribute snapshots with monotonic-clock expiry
//! - Hub descriptors for tracking registered gateways
//! - Class schemas describing the attribute surface of each function class
//! - The error taxonomy shared by every fallible operation

pub mod error;
pub mod function;
pub mod schema;
pub mod snapshot;
pub mod value;

pub use error::{AxonError, ErrorKind, SUCCESS};
pub use function::{
    parse_hub_url, FunctionKey, HardwareId, HubCredentials, HubDescriptor, HubId, HubState,
};
pub use schema::{AttrKind, AttributeSpec, ClassSchema, SchemaRegistry};
pub use snapshot::AttributeSnapshot;
pub use value::{AttrValue, INVALID_FLOAT, INVALID_INT, INVALID_STRING};
