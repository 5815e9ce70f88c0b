//! `@import` target resolution.
//!
//! Module paths (`./x`, `../x`, `/x`, `.`, `..`) race the file against the
//! directory of the same name. Library paths race the module lookup under the
//! library directory of every ancestor of the importing file. The first
//! candidate that loads wins; "not found" losers are ignored and any other
//! failure aborts the import. Dropping the remaining candidates cancels them.

use crate::loader::Loader;
use anyhow::{Context as _, Error};
use css_tree::paths::{normalize, resolve};
use css_tree::{ErrorKind, EvalError, EvalResult, Loc, Options};
use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt as _};
use log::{debug, trace};
use serde::Deserialize;
use serde_json::{Value, from_str};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

const PACKAGE_DESCRIPTOR: &str = "package.json";

/// A file chosen for an import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// Normalized absolute path, also the key in the import cache.
    pub path: PathBuf,
    pub content: String,
}

/// Why a candidate lost.
enum Miss {
    NotFound,
    Failed(Error),
}

/// `Ok(None)` means the candidate was imported before.
type Attempt = Result<Option<SourceFile>, Miss>;

#[derive(Deserialize)]
struct PackageDescriptor {
    main: Option<Value>,
}

/// Candidate search for one compilation.
pub struct Resolver<'res> {
    loader: &'res dyn Loader,
    cache: &'res HashMap<PathBuf, String>,
    imported: &'res HashSet<PathBuf>,
    extension: &'res str,
    library_dir: &'res str,
}

impl<'res> Resolver<'res> {
    pub fn new(
        loader: &'res dyn Loader,
        options: &'res Options,
        imported: &'res HashSet<PathBuf>,
    ) -> Self {
        Self {
            loader,
            cache: &options.imports,
            imported,
            extension: &options.extension,
            library_dir: &options.library_dir,
        }
    }

    /// Resolve `target` as written in an `@import` inside the directory `base`.
    ///
    /// Returns `None` when the winning file was already imported.
    ///
    /// # Errors
    /// `ModuleNotFound` when every candidate is missing, `Io` when a candidate
    /// fails for another reason or a package descriptor is malformed.
    pub async fn resolve(
        &self,
        target: &str,
        base: &Path,
        loc: &Loc,
    ) -> EvalResult<Option<SourceFile>> {
        trace!("resolving '{target}' from {}", base.display());
        let attempt = if is_module_path(target) {
            self.module(PathBuf::from(target), base.to_path_buf()).await
        } else {
            self.library(PathBuf::from(target), base).await
        };
        match attempt {
            Ok(found) => {
                if let Some(file) = &found {
                    debug!("resolved '{target}' to {}", file.path.display());
                }
                Ok(found)
            }
            Err(Miss::NotFound) => Err(EvalError::new(
                ErrorKind::ModuleNotFound,
                format!("Cannot find module '{target}'"),
                loc,
            )),
            Err(Miss::Failed(error)) => {
                let message = format!("cannot import '{target}': {error:#}");
                Err(EvalError::new(ErrorKind::Io, message, loc).with_source(error))
            }
        }
    }

    /// The file itself (with the default extension when it has none) raced
    /// against the directory. A trailing `/`, `.` or `..` means directory only.
    fn module(&self, path: PathBuf, base: PathBuf) -> LocalBoxFuture<'_, Attempt> {
        async move {
            let text = path.to_string_lossy();
            if text.ends_with('/') || text == "." || text == ".." {
                return self.directory(resolve(&base, &path)).await;
            }
            let file = if path.extension().is_some() {
                path.clone()
            } else {
                path.with_extension(self.extension)
            };
            first_found(vec![
                self.file(resolve(&base, &file)),
                self.directory(resolve(&base, &path)),
            ])
            .await
        }
        .boxed_local()
    }

    /// The package descriptor's `main` raced against the index file.
    fn directory(&self, directory: PathBuf) -> LocalBoxFuture<'_, Attempt> {
        let index = directory.join(format!("index.{}", self.extension));
        first_found(vec![self.package(directory), self.file(index)]).boxed_local()
    }

    fn package(&self, directory: PathBuf) -> LocalBoxFuture<'_, Attempt> {
        async move {
            let descriptor_path = directory.join(PACKAGE_DESCRIPTOR);
            let content = self.read(&descriptor_path).await?;
            let descriptor: PackageDescriptor = from_str(&content)
                .with_context(|| {
                    format!("malformed package descriptor {}", descriptor_path.display())
                })
                .map_err(Miss::Failed)?;
            let Some(main) = descriptor.main.as_ref().and_then(Value::as_str) else {
                trace!("{} has no main entry", descriptor_path.display());
                return Err(Miss::NotFound);
            };
            self.file(resolve(&directory, Path::new(main))).await
        }
        .boxed_local()
    }

    fn file(&self, path: PathBuf) -> LocalBoxFuture<'_, Attempt> {
        async move {
            if self.imported.contains(&path) {
                trace!("{} was already imported", path.display());
                return Ok(None);
            }
            let content = self.read(&path).await?;
            Ok(Some(SourceFile { path, content }))
        }
        .boxed_local()
    }

    /// Module lookup under every ancestor's library directory, nearest first.
    async fn library(&self, path: PathBuf, base: &Path) -> Attempt {
        let mut directories: Vec<PathBuf> = base
            .ancestors()
            .map(|ancestor| normalize(&ancestor.join(self.library_dir)))
            .collect();
        directories.dedup();
        let candidates = directories
            .into_iter()
            .map(|directory| self.module(path.clone(), directory))
            .collect();
        first_found(candidates).await
    }

    /// Cached content, or whatever the loader returns.
    async fn read(&self, path: &Path) -> Result<String, Miss> {
        if let Some(content) = self.cache.get(path) {
            trace!("cache hit for {}", path.display());
            return Ok(content.clone());
        }
        match self.loader.load(path).await {
            Ok(content) => Ok(content),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Err(Miss::NotFound),
            Err(error) => Err(Miss::Failed(
                Error::new(error).context(format!("cannot read {}", path.display())),
            )),
        }
    }
}

/// First candidate to succeed. Fatal failures win over later candidates too.
async fn first_found(candidates: Vec<LocalBoxFuture<'_, Attempt>>) -> Attempt {
    let mut pending: FuturesUnordered<_> = candidates.into_iter().collect();
    while let Some(attempt) = pending.next().await {
        match attempt {
            Err(Miss::NotFound) => {}
            decided => return decided,
        }
    }
    Err(Miss::NotFound)
}

/// `./x`, `../x`, `/x`, `.` or `..`; anything else is looked up as a library.
fn is_module_path(target: &str) -> bool {
    matches!(target, "." | "..")
        || target.starts_with("./")
        || target.starts_with("../")
        || target.starts_with('/')
}
