mod manifest;

pub use manifest::{
    BuildDef, CorpusDef, HarnessManifest, ManifestLoader, TestSourceDef, Timeouts,
};
