//! Process-scoped interning tables for [`Name`] and [`Operator`].
//!
//! Two distinct tables exist, matching the source's `PSLiteralTable` /
//! `PSKeywordTable` split: one keyed on literal-name payloads (which may
//! arrive as text or raw bytes and are not coerced between the two — the
//! hash key is exactly the payload as supplied), the other keyed on raw
//! operator-mnemonic bytes. Both return handles whose equality is pointer
//! identity, so that checking a token against a structural operator is an
//! `Arc::ptr_eq`, not a byte compare.
//!
//! Concurrency: both tables are backed by [`dashmap::DashMap`] rather than a
//! `Mutex<HashMap<_>>`, so interning from many parser instances on many
//! threads never serializes unrelated lookups.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

/// An interned PostScript literal name (`/Ident`).
///
/// Equality and hashing are by payload *identity*, not payload value: two
/// `Name`s are equal iff they were interned from the same table entry.
#[derive(Clone, Debug)]
pub struct Name(Arc<[u8]>);

impl Name {
    /// The raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode the payload as UTF-8, if valid.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

/// An interned PostScript operator/keyword mnemonic, e.g. `obj`, `endobj`,
/// or one of the six structural markers `[ ] << >> { }`.
#[derive(Clone, Debug)]
pub struct Operator(Arc<[u8]>);

impl Operator {
    /// The raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Operator {}

impl Hash for Operator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

/// Either textual or raw-byte form of a name payload, as the source allows.
#[derive(Clone, Copy, Debug)]
pub enum NamePayload<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

impl<'a> NamePayload<'a> {
    fn as_bytes(&self) -> &'a [u8] {
        match self {
            NamePayload::Text(s) => s.as_bytes(),
            NamePayload::Bytes(b) => b,
        }
    }
}

impl<'a> From<&'a str> for NamePayload<'a> {
    fn from(s: &'a str) -> Self {
        NamePayload::Text(s)
    }
}

impl<'a> From<&'a [u8]> for NamePayload<'a> {
    fn from(b: &'a [u8]) -> Self {
        NamePayload::Bytes(b)
    }
}

/// A generic, thread-safe interning table keyed by raw bytes.
struct InternTable<T> {
    entries: DashMap<Vec<u8>, Arc<[u8]>>,
    wrap: fn(Arc<[u8]>) -> T,
}

impl<T> InternTable<T> {
    fn new(wrap: fn(Arc<[u8]>) -> T) -> Self {
        Self {
            entries: DashMap::new(),
            wrap,
        }
    }

    fn intern(&self, payload: &[u8]) -> T {
        if let Some(existing) = self.entries.get(payload) {
            return (self.wrap)(Arc::clone(existing.value()));
        }
        let arc: Arc<[u8]> = Arc::from(payload);
        let inserted = self
            .entries
            .entry(payload.to_vec())
            .or_insert_with(|| Arc::clone(&arc));
        (self.wrap)(Arc::clone(inserted.value()))
    }
}

/// Process-wide table of interned [`Name`]s.
pub struct NameTable {
    inner: InternTable<Name>,
}

impl NameTable {
    fn new() -> Self {
        Self {
            inner: InternTable::new(Name),
        }
    }

    /// Intern a name payload, returning the canonical [`Name`] for it.
    /// Payload may arrive as text or raw bytes; the hash key is exactly the
    /// bytes supplied, with no coercion between the two representations.
    pub fn intern<'a>(&self, payload: impl Into<NamePayload<'a>>) -> Name {
        self.inner.intern(payload.into().as_bytes())
    }
}

/// Process-wide table of interned [`Operator`]s.
pub struct OperatorTable {
    inner: InternTable<Operator>,
}

impl OperatorTable {
    fn new() -> Self {
        Self {
            inner: InternTable::new(Operator),
        }
    }

    /// Intern an operator mnemonic, always keyed by raw bytes.
    pub fn intern(&self, payload: &[u8]) -> Operator {
        self.inner.intern(payload)
    }
}

/// The global name table. Grows monotonically for the life of the process.
pub static NAMES: LazyLock<NameTable> = LazyLock::new(NameTable::new);

/// The global operator table. Grows monotonically for the life of the process.
pub static OPERATORS: LazyLock<OperatorTable> = LazyLock::new(OperatorTable::new);

/// The six structural operators that drive composite-object construction.
/// Pre-interned so that structural equality checks are a single `ptr_eq`.
pub struct StructuralOperators {
    pub array_begin: Operator,
    pub array_end: Operator,
    pub dict_begin: Operator,
    pub dict_end: Operator,
    pub proc_begin: Operator,
    pub proc_end: Operator,
}

pub static STRUCTURAL: LazyLock<StructuralOperators> = LazyLock::new(|| StructuralOperators {
    array_begin: OPERATORS.intern(b"["),
    array_end: OPERATORS.intern(b"]"),
    dict_begin: OPERATORS.intern(b"<<"),
    dict_end: OPERATORS.intern(b">>"),
    proc_begin: OPERATORS.intern(b"{"),
    proc_end: OPERATORS.intern(b"}"),
});
