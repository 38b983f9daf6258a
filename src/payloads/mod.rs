//! Pure builders for composite mutation bodies. Nothing in here performs I/O.

pub mod addressing;
pub mod cabling;
pub mod ct;
pub mod generic_system;
pub mod lacp;
pub mod tagging;

pub use addressing::SubinterfaceAddressing;
pub use cabling::{CablingMapPatch, InterfaceRename};
pub use ct::{BatchApply, ConnectivityTemplate, LeafPolicy, PolicySet, TagType};
pub use generic_system::{build_generic_system, derive_logical_device, GenericSystemSpec, LagMode, ResolvedLink};
pub use lacp::{build_link_labels, LagEntry, LinkLabels, LinkMember};
pub use tagging::TaggingDelta;
