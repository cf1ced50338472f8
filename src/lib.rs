// Crate root: declare modules and control visibility
pub mod compare;
pub mod parse;
pub mod report;
pub mod sections;
pub mod symbols;

// Re-export commonly used API from the library for binaries/tests
pub use compare::{compare_builds, render_comparison, BuildDelta};
pub use parse::{parse_map, MapInfo, ObjectContribution};
pub use report::render_report;
pub use sections::{SectionKind, SectionRecord};
