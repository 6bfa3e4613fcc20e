//! mkvmerge command line parsing, batch templating and track adjustment.

pub mod adjust;
pub mod analysis;
pub mod attachments;
pub mod command;
pub mod flags;
pub mod paths;
pub mod quoting;
pub mod source;
pub mod template;
pub mod track_options;
pub mod track_order;

pub use adjust::{adjust_sources, Adjustment};
pub use analysis::{Analysis, AnalysisLine, Severity};
pub use command::{BatchEntry, MkvCommand, ParseOptions};
pub use template::{CommandTemplate, Placeholder, Segment, Substitution};
pub use track_options::{OptionEntry, TrackOptions, Translation};
pub use track_order::TrackOrder;
