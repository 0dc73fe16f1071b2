// Rules module - text analysis stages of the compliance pipeline
// - section_detection.rs: heading-pattern section extraction
// - matcher.rs: stipulation to section scoring and excerpt selection
// - covenant_detection.rs: covenant pattern extraction over sections

pub mod covenant_detection;
pub mod matcher;
pub mod section_detection;

pub use covenant_detection::CovenantDetector;
pub use matcher::{RuleMatcher, SectionScore, TRUNCATION_MARKER};
pub use section_detection::SectionExtractor;
