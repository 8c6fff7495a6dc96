//! This module provides the `MachineLoader` struct, responsible for loading machine
//! descriptions from files, directories and strings.
//!
//! A description file names its machine kind through its extension: `parity.dfa`,
//! `parens.dpda`, `same-ends.1tm` and so on.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::machine::Machine;
use crate::types::{MachineError, MachineKind, MAX_DESCRIPTION_SIZE};

/// A machine loaded from a description, together with the advisory warnings it produced.
pub type Loaded = (Machine, Vec<String>);

/// `MachineLoader` is a utility struct for loading machine descriptions.
pub struct MachineLoader;

impl MachineLoader {
    /// The machine kind named by the extension of `path`, if any.
    pub fn kind_of(path: &Path) -> Option<MachineKind> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    /// Loads a machine of the given kind from the specified file path.
    ///
    /// # Arguments
    ///
    /// * `kind` - The kind the description is parsed as.
    /// * `path` - A reference to the `Path` of the description file.
    ///
    /// # Returns
    ///
    /// * `Ok((Machine, warnings))` if the file is read and parsed without fatal diagnostics.
    /// * `Err(MachineError::File)` if the file cannot be read or exceeds `MAX_DESCRIPTION_SIZE`.
    /// * `Err(MachineError::Description)` with the first fatal diagnostic otherwise.
    pub fn load_machine(kind: MachineKind, path: &Path) -> Result<Loaded, MachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            MachineError::File(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        if content.len() > MAX_DESCRIPTION_SIZE {
            return Err(MachineError::File(format!(
                "File {} exceeds the maximum description size of {} bytes",
                path.display(),
                MAX_DESCRIPTION_SIZE
            )));
        }

        debug!(kind = %kind, path = %path.display(), "Loading machine description");
        Self::from_string(kind, &content)
    }

    /// Loads a machine of the given kind from the provided description text.
    ///
    /// This is useful for descriptions that are not stored in files, e.g. from user input.
    pub fn from_string(kind: MachineKind, content: &str) -> Result<Loaded, MachineError> {
        Machine::from_description(kind, content)
    }

    /// Loads every description file of a directory, inferring kinds from the extensions.
    ///
    /// Directories and files whose extension is not a machine kind are skipped.
    ///
    /// # Returns
    ///
    /// * `Vec<Result<(PathBuf, Machine), MachineError>>` - One element per candidate file,
    ///   sorted by path, holding either the loaded machine or the reason it failed.
    pub fn load_machines(directory: &Path) -> Vec<Result<(PathBuf, Machine), MachineError>> {
        if !directory.exists() {
            return vec![Err(MachineError::File(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(MachineError::File(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        let mut results = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => results.push(Err(MachineError::File(format!(
                    "Failed to read directory entry: {}",
                    e
                )))),
            }
        }
        paths.sort();

        for path in paths {
            let Some(kind) = Self::kind_of(&path).filter(|_| !path.is_dir()) else {
                continue;
            };
            results.push(match Self::load_machine(kind, &path) {
                Ok((machine, _)) => Ok((path, machine)),
                Err(e) => Err(MachineError::File(format!(
                    "Failed to load machine from {}: {}",
                    path.display(),
                    e
                ))),
            });
        }
        results
    }
}
