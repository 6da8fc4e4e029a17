//! Type descriptor lookup.
//!
//! The metadata table names types; the containment oracle works on
//! descriptor handles. A [`TypeDescriptorLookup`] bridges the two.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use object::{Object, ObjectSymbol};
use tracing::debug;

use crate::error::{PolycheckError, PolycheckResult};
use crate::types::TypeHandle;

/// Resolves type names to descriptor handles
///
/// Implementations must be deterministic: the type map is built once and
/// every later check relies on the handles it recorded.
pub trait TypeDescriptorLookup: Send + Sync
{
    /// Handle for the descriptor named `name`, or `None` if there is none.
    fn resolve_type(&self, name: &str) -> Option<TypeHandle>;
}

/// Descriptor lookup backed by the symbol table of the descriptor binary
///
/// The toolchain emits one symbol per type descriptor, named exactly like
/// the `type_name` column of the allocation table. The handle is the
/// symbol's address in the binary.
#[derive(Debug, Clone)]
pub struct SymbolTableLookup
{
    path: PathBuf,
    symbols: HashMap<String, u64>,
}

impl SymbolTableLookup
{
    /// Parse the descriptor binary at `path` and index its defined symbols.
    ///
    /// Both the static and the dynamic symbol tables are read; a stripped
    /// shared object only has the latter.
    ///
    /// ## Errors
    ///
    /// Returns [`PolycheckError::DescriptorLoad`] if the file cannot be read
    /// or is not an object file.
    pub fn open(path: &Path) -> PolycheckResult<Self>
    {
        let load_error = |reason: String| PolycheckError::DescriptorLoad {
            path: path.to_path_buf(),
            reason,
        };

        let data = fs::read(path).map_err(|err| load_error(err.to_string()))?;
        let file = object::File::parse(&*data).map_err(|err| load_error(err.to_string()))?;

        let mut symbols = HashMap::new();
        for symbol in file.symbols().chain(file.dynamic_symbols()) {
            if symbol.is_undefined() {
                continue;
            }
            if let Ok(name) = symbol.name() {
                if !name.is_empty() {
                    symbols.entry(name.to_string()).or_insert(symbol.address());
                }
            }
        }

        debug!(path = %path.display(), symbols = symbols.len(), "Loaded type descriptor symbols");
        Ok(Self {
            path: path.to_path_buf(),
            symbols,
        })
    }

    /// Path of the descriptor binary.
    #[must_use]
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Number of indexed symbols.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    /// Whether the binary defined no symbols at all.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }
}

impl TypeDescriptorLookup for SymbolTableLookup
{
    fn resolve_type(&self, name: &str) -> Option<TypeHandle>
    {
        self.symbols.get(name).copied().map(TypeHandle::from_raw)
    }
}

impl<F> TypeDescriptorLookup for F
where
    F: Fn(&str) -> Option<TypeHandle> + Send + Sync,
{
    fn resolve_type(&self, name: &str) -> Option<TypeHandle>
    {
        self(name)
    }
}
