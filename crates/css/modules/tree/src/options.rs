//! Evaluation options.

use crate::paths::dirname;
use crate::scope::Scope;
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_EXTENSION: &str = "roo";
pub const DEFAULT_LIBRARY_DIR: &str = "node_modules";

/// Options shared by every pass of one compilation.
#[derive(Clone, Debug)]
pub struct Options {
    /// Path of the root stylesheet.
    pub filename: PathBuf,
    /// Directory the emitted CSS will live in. Relative urls are rewritten against it.
    pub out: PathBuf,
    /// Preloaded file contents keyed by absolute path. Loaded imports are written back.
    pub imports: HashMap<PathBuf, String>,
    /// Replaces the default initial chain (builtins plus one empty frame).
    pub scope: Option<Scope>,
    /// Extension appended to import paths that have none.
    pub extension: String,
    /// Library directory searched by bare import paths.
    pub library_dir: String,
}

impl Options {
    /// Options for `filename`, emitting next to it.
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        let filename = filename.into();
        let out = dirname(&filename);
        Self {
            filename,
            out,
            imports: HashMap::new(),
            scope: None,
            extension: DEFAULT_EXTENSION.to_owned(),
            library_dir: DEFAULT_LIBRARY_DIR.to_owned(),
        }
    }

    #[must_use]
    pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
        self.out = out.into();
        self
    }

    #[must_use]
    pub fn with_imports(mut self, imports: HashMap<PathBuf, String>) -> Self {
        self.imports = imports;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        extension.clone_into(&mut self.extension);
        self
    }

    #[must_use]
    pub fn with_library_dir(mut self, library_dir: &str) -> Self {
        library_dir.clone_into(&mut self.library_dir);
        self
    }
}
