pub mod posting;
pub mod resume;
pub mod source;

pub use posting::{Posting, RankedMatch};
pub use resume::ParsedResume;
pub use source::SourceDescriptor;
