//! # Containment Oracle
//!
//! Answers "does type A occur as a subobject of type B?". The search over
//! compiled descriptors belongs to the runtime type library the host links
//! against; the checker only sees it through [`ContainmentOracle`].
//!
//! [`LayoutCatalog`] is a self-contained implementation over layouts
//! declared in memory. It doubles as a [`TypeDescriptorLookup`], so a host
//! that knows its type layouts (or a test) can drive the whole checker with
//! a single value.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::metadata::TypeDescriptorLookup;
use crate::types::TypeHandle;

/// Where a matching subobject was found
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubobjectMatch
{
    /// Byte offset of the subobject inside the examined type
    pub offset: u64,
    /// Member names walked from the examined type down to the subobject
    /// (empty when the two types are the same)
    pub path: Vec<String>,
}

impl fmt::Display for SubobjectMatch
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.path.is_empty() {
            write!(f, "+{}", self.offset)
        } else {
            write!(f, "+{} via {}", self.offset, self.path.join("."))
        }
    }
}

/// Subobject search capability
pub trait ContainmentOracle: Send + Sync
{
    /// Locate `target` as a subobject of `examined`.
    fn find_subobject(&self, target: TypeHandle, examined: TypeHandle) -> Option<SubobjectMatch>;

    /// Whether `target` occurs anywhere inside `examined` (including being
    /// the same type).
    fn contains(&self, target: TypeHandle, examined: TypeHandle) -> bool
    {
        self.find_subobject(target, examined).is_some()
    }
}

/// A named member of a declared layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutMember
{
    /// Member name (a field, or a base class name)
    pub name: String,
    /// Byte offset inside the enclosing type
    pub offset: u64,
    /// Member type
    pub ty: TypeHandle,
}

#[derive(Debug, Clone)]
struct Layout
{
    name: String,
    members: Vec<LayoutMember>,
}

/// In-memory table of type layouts
///
/// Handles are assigned sequentially in declaration order. Members may only
/// refer to types that were declared earlier, so a layout can never contain
/// itself; members naming any other handle are dropped.
///
/// ```rust
/// use polycheck_core::containment::{ContainmentOracle, LayoutCatalog};
///
/// let mut catalog = LayoutCatalog::new();
/// let base = catalog.declare_opaque("Base");
/// let derived = catalog.declare("Derived", [("tag", 0, base), ("base", 8, base)]);
/// assert!(catalog.contains(base, derived));
/// assert!(!catalog.contains(derived, base));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LayoutCatalog
{
    layouts: Vec<Layout>,
    by_name: HashMap<String, TypeHandle>,
}

impl LayoutCatalog
{
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Declare a type without members (a scalar or an opaque aggregate).
    pub fn declare_opaque(&mut self, name: &str) -> TypeHandle
    {
        self.declare(name, Vec::<(&str, u64, TypeHandle)>::new())
    }

    /// Declare a type with the given `(name, offset, type)` members.
    ///
    /// Redeclaring a name replaces the name binding; the old handle stays
    /// valid for layouts that already refer to it.
    pub fn declare<'a, I>(&mut self, name: &str, members: I) -> TypeHandle
    where
        I: IntoIterator<Item = (&'a str, u64, TypeHandle)>,
    {
        let handle = TypeHandle::from_raw(self.layouts.len() as u64);
        let members = members
            .into_iter()
            .filter(|(member, _, ty)| {
                let known = *ty < handle;
                if !known {
                    warn!(layout = name, member, "Dropping member of undeclared type {ty}");
                }
                known
            })
            .map(|(member, offset, ty)| LayoutMember {
                name: member.to_string(),
                offset,
                ty,
            })
            .collect();
        self.layouts.push(Layout {
            name: name.to_string(),
            members,
        });
        self.by_name.insert(name.to_string(), handle);
        handle
    }

    /// Name a handle was declared with.
    #[must_use]
    pub fn name_of(&self, handle: TypeHandle) -> Option<&str>
    {
        self.layout(handle).map(|layout| layout.name.as_str())
    }

    /// Members of a declared type.
    #[must_use]
    pub fn members(&self, handle: TypeHandle) -> Option<&[LayoutMember]>
    {
        self.layout(handle).map(|layout| layout.members.as_slice())
    }

    /// Number of declared types.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.layouts.len()
    }

    /// Whether no type has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.layouts.is_empty()
    }

    fn layout(&self, handle: TypeHandle) -> Option<&Layout>
    {
        usize::try_from(handle.raw()).ok().and_then(|idx| self.layouts.get(idx))
    }

    // Depth-first, members in declaration order: the first match is the
    // lowest-offset path when members are declared in offset order.
    fn search(&self, target: TypeHandle, current: TypeHandle, offset: u64, path: &mut Vec<String>) -> Option<SubobjectMatch>
    {
        if current == target {
            return Some(SubobjectMatch {
                offset,
                path: path.clone(),
            });
        }
        let layout = self.layout(current)?;
        for member in &layout.members {
            path.push(member.name.clone());
            let found = self.search(target, member.ty, offset.saturating_add(member.offset), path);
            path.pop();
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

impl ContainmentOracle for LayoutCatalog
{
    fn find_subobject(&self, target: TypeHandle, examined: TypeHandle) -> Option<SubobjectMatch>
    {
        self.layout(examined)?;
        self.search(target, examined, 0, &mut Vec::new())
    }
}

impl TypeDescriptorLookup for LayoutCatalog
{
    fn resolve_type(&self, name: &str) -> Option<TypeHandle>
    {
        self.by_name.get(name).copied()
    }
}
