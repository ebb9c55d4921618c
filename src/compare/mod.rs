mod comparison;
mod comparator;

pub use comparison::{
    DigestComparison, DigestOutcome, Report, RunSummary,
    normalize_digest, UNABLE_TO_DIGEST,
};
pub use comparator::{CaptureSource, DigestComparator};
