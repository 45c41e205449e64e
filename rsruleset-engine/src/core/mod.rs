pub mod bucket;
pub mod category;
pub mod provenance;
pub mod segment;

pub use bucket::Bucket;
pub use category::Category;
pub use provenance::Provenance;
pub use segment::{SegmentAggregator, SegmentSet};
