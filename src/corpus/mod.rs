mod checksum;
mod generator;

pub use checksum::sha256_file;
pub use generator::{CommandCorpus, CorpusGenerator, FileCorpus, truncate_head};
pub(crate) use generator::count_lines;
