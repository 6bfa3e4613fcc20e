//! Media track inspection and structure comparison.

pub mod inspect;
pub mod track;
pub mod verify;

pub use inspect::{InspectCache, MkvmergeInspector, TrackInspector};
pub use track::{MediaStructure, TrackDescriptor, TrackType};
pub use verify::{verify_structure, StructureReport};
