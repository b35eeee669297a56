//! Driver registry with atomic refresh.
//!
//! The catalogue is an immutable map behind an [`ArcSwap`]. Readers take a
//! snapshot (`Arc`) of a definition and keep using it even if the registry
//! is refreshed meanwhile.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::info;

use super::definition::DriverDefinition;
use super::loader::parse_definition;
use super::vendors;
use crate::error::PlatformError;

/// Where driver documents come from.
pub trait DriverSource: Send + Sync {
    /// Read every document as `(origin, text)`.
    fn documents(&self) -> Result<Vec<(String, String)>, PlatformError>;
}

/// The definitions compiled into the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinSource;

impl DriverSource for BuiltinSource {
    fn documents(&self) -> Result<Vec<(String, String)>, PlatformError> {
        Ok(vendors::BUILTIN
            .iter()
            .map(|(origin, text)| (origin.to_string(), text.to_string()))
            .collect())
    }
}

/// Every `*.toml` file of a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DriverSource for DirectorySource {
    fn documents(&self) -> Result<Vec<(String, String)>, PlatformError> {
        let io_error = |path: &PathBuf| {
            let path = path.clone();
            move |source| PlatformError::Io { path, source }
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.path).map_err(io_error(&self.path))? {
            let path = entry.map_err(io_error(&self.path))?.path();
            if path.extension().is_some_and(|e| e == "toml") {
                files.push(path);
            }
        }
        files.sort();

        files
            .into_iter()
            .map(|path| {
                let text = std::fs::read_to_string(&path).map_err(io_error(&path))?;
                Ok((path.display().to_string(), text))
            })
            .collect()
    }
}

type Catalogue = HashMap<String, Arc<DriverDefinition>>;

/// Registry of driver definitions.
pub struct DriverRegistry {
    sources: Vec<Box<dyn DriverSource>>,
    catalogue: ArcSwap<Catalogue>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("sources", &self.sources.len())
            .field("drivers", &self.names())
            .finish()
    }
}

impl DriverRegistry {
    /// Create a registry and load it from `sources`.
    pub fn new(sources: Vec<Box<dyn DriverSource>>) -> Result<Self, PlatformError> {
        let registry = Self {
            sources,
            catalogue: ArcSwap::from_pointee(Catalogue::new()),
        };
        registry.refresh()?;
        Ok(registry)
    }

    /// Registry holding the built-in definitions only.
    pub fn builtin() -> Result<Self, PlatformError> {
        Self::new(vec![Box::new(BuiltinSource)])
    }

    /// Reload every source.
    ///
    /// Either all definitions are replaced or none are: on any parse or
    /// validation error, or a duplicate name, the current catalogue stays.
    pub fn refresh(&self) -> Result<(), PlatformError> {
        let mut catalogue = Catalogue::new();
        for source in &self.sources {
            for (origin, text) in source.documents()? {
                let definition = parse_definition(&text, &origin)?;
                let name = definition.name().to_owned();
                if catalogue.contains_key(&name) {
                    return Err(PlatformError::AlreadyRegistered { name });
                }
                catalogue.insert(name, Arc::new(definition));
            }
        }
        info!("Driver registry loaded with {} drivers", catalogue.len());
        self.catalogue.store(Arc::new(catalogue));
        Ok(())
    }

    /// Look a driver up by exact name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<DriverDefinition>> {
        self.catalogue.load().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.catalogue.load().contains_key(name)
    }

    /// Sorted driver names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.catalogue.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// First driver (by name) whose discovery rule matches.
    pub fn discover(&self, sys_object_id: &str, sys_descr: &str) -> Option<Arc<DriverDefinition>> {
        let catalogue = self.catalogue.load();
        let mut matching: Vec<&Arc<DriverDefinition>> = catalogue
            .values()
            .filter(|d| d.matches_discovery(sys_object_id, sys_descr))
            .collect();
        matching.sort_by(|a, b| a.name().cmp(b.name()));
        matching.first().map(|d| Arc::clone(d))
    }
}
