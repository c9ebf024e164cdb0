pub mod layout;
pub mod split;
pub mod builder;

pub use layout::{ClassLabel, DatasetLayout, Split};
pub use split::{SplitPercentages, SplitPlan};
pub use builder::{collect_source_files, BuildSummary, ClassSource, CopiedSplit, DatasetBuilder};
