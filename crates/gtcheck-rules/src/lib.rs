//! # gtcheck-rules
//!
//! Validation of a prompt corpus against the registries:
//!
//! ```text
//! CorpusLayout ──▶ Registries (backends + API surfaces)
//!      │                 │
//!      ▼                 ▼
//! PromptCorpusWalker ──▶ ValidationRules ──▶ ValidationReport
//!   files → entries → turns → calls
//! ```
//!
//! Findings are data: every rule pushes [`ValidationIssue`]s into an
//! [`IssueSink`], and only environment failures (an unlistable directory)
//! surface as [`RulesError`].
//!
//! [`ValidationIssue`]: gtcheck_kernel::ValidationIssue
//! [`IssueSink`]: gtcheck_kernel::IssueSink

pub mod layout;
pub mod report;
pub mod rules;
pub mod walker;

pub use layout::{CorpusLayout, Registries};
pub use report::{Outcome, ValidationCounters, ValidationReport};
pub use rules::{
    CallSite, IdShape, REFERENCE_RULES, ReferenceRule, Search, USER_ID_ARGUMENTS, ValidationRules,
};
pub use walker::{PromptCorpusWalker, inferred_service};

use gtcheck_registry::RegistryError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("{}: I/O error: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub struct TempDirGuard {
        path: PathBuf,
    }

    impl TempDirGuard {
        pub fn new(prefix: &str) -> Self {
            let unique = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock should be after unix epoch")
                .as_nanos();
            let path = std::env::temp_dir().join(format!(
                "gtcheck-rules-{prefix}-{}-{unique}",
                std::process::id()
            ));
            fs::create_dir_all(&path).expect("temp dir should be created");
            Self { path }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Write `contents` to `relative`, creating parent directories.
        pub fn write(&self, relative: &str, contents: &str) {
            let target = self.path.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).expect("parent dir should be created");
            }
            fs::write(target, contents).expect("fixture should write");
        }
    }

    impl Drop for TempDirGuard {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
