//! Declarative driver definitions.
//!
//! A driver describes one kind of device as data: its CLI modes and the
//! macros moving between them, the command program of a snapshot and the
//! rules turning command output into attributes. Definitions are written
//! in TOML, compiled once by [`parse_definition`] and served by the
//! [`DriverRegistry`].

mod attribute;
mod definition;
mod document;
mod loader;
mod mode;
mod registry;
mod rules;
pub mod vendors;

pub use attribute::{AttributeDefinition, DumpHints};
pub use definition::{DiscoveryRule, DriverDefinition, DriverInfo, TrapRule};
pub use loader::parse_definition;
pub use mode::{CliMode, MacroDef, ModeRole, Pager, ViewerQuit};
pub use registry::{BuiltinSource, DirectorySource, DriverRegistry, DriverSource};
pub use rules::{
    AddressFamily, Capture, ExtractionRule, FieldRule, ForEach, GroupRef, Occurrence,
    ProgramStep, SectionMode, StepAction, StructField, StructureKind, StructureRule, Target,
    Transform,
};
