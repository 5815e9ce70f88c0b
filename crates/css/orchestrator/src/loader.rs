//! Source loading by path.

use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use log::trace;
use std::io;
use std::path::Path;
use tokio::fs::read_to_string;

/// Fetches stylesheet sources for imports.
pub trait Loader {
    /// Load the text at `path`.
    ///
    /// # Errors
    /// `io::ErrorKind::NotFound` when nothing exists at `path`. Any other error
    /// aborts the import that asked for it.
    fn load<'load>(&'load self, path: &'load Path) -> LocalBoxFuture<'load, io::Result<String>>;
}

/// Reads sources from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsLoader;

impl Loader for FsLoader {
    fn load<'load>(&'load self, path: &'load Path) -> LocalBoxFuture<'load, io::Result<String>> {
        trace!("reading {}", path.display());
        read_to_string(path).boxed_local()
    }
}
