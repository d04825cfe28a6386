//! Component B of the analysis pipeline: pivot detection, clustering into
//! Creek/Ice/Jump levels, range quality scoring, and the active-range index.

pub mod clustering;
pub mod detector;
pub mod error;
pub mod index;
pub mod levels;
pub mod pivots;

pub use detector::{RangeDetector, RangeDetectorConfig};
pub use error::RangesError;
pub use index::RangeIndex;
