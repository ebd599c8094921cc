use std::fmt::Display;
use std::ptr;

use typed_arena::Arena;

use crate::table::Table;
use crate::value::Value;

/// An interned string. Owns its character storage; the FNV-1a hash is
/// computed once, at construction.
#[derive(Debug)]
pub struct ObjString {
    pub chars: String,
    pub hash: u32,
}

impl ObjString {
    pub fn new(chars: &str) -> Self {
        ObjString {
            chars: chars.to_owned(),
            hash: hash_string(chars),
        }
    }
}

impl Display for ObjString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.chars)
    }
}

/// A heap-allocated value. Strings are the only variant for now; the arena
/// rooted at the VM owns every allocation, so all objects are freed exactly
/// once when the arena drops.
#[derive(Copy, Clone, Debug)]
pub enum Obj<'heap> {
    String(&'heap ObjString),
}

/// Interned strings compare by identity.
impl PartialEq for Obj<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Obj::String(a), Obj::String(b)) => ptr::eq(*a, *b),
        }
    }
}

impl Display for Obj<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Obj::String(s) => write!(f, "{}", s),
        }
    }
}

/// 32-bit FNV-1a.
pub fn hash_string(chars: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for byte in chars.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// Returns the unique `ObjString` for `chars`, allocating only when no
/// string with this content has been interned yet. The intern table holds a
/// non-owning reference; the arena remains the single owner.
pub fn intern<'heap>(
    heap: &'heap Arena<ObjString>,
    strings: &mut Table<'heap>,
    chars: &str,
) -> &'heap ObjString {
    let hash = hash_string(chars);
    if let Some(existing) = strings.find_interned(chars, hash) {
        return existing;
    }

    let object: &'heap ObjString = heap.alloc(ObjString {
        chars: chars.to_owned(),
        hash,
    });
    strings.set(object, Value::Nil);
    object
}

pub fn concatenate<'heap>(
    heap: &'heap Arena<ObjString>,
    strings: &mut Table<'heap>,
    first: &ObjString,
    second: &ObjString,
) -> &'heap ObjString {
    let mut chars = String::with_capacity(first.chars.len() + second.chars.len());
    chars.push_str(&first.chars);
    chars.push_str(&second.chars);
    intern(heap, strings, &chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_vectors() {
        assert_eq!(hash_string(""), 2166136261);
        assert_eq!(hash_string("a"), 0xe40c292c);
        assert_eq!(hash_string("foobar"), 0xbf9cf968);
    }

    #[test]
    fn interning_is_idempotent() {
        let heap = Arena::new();
        let mut strings = Table::new();
        let first = intern(&heap, &mut strings, "hello");
        let second = intern(&heap, &mut strings, "hello");
        assert!(ptr::eq(first, second));
        let other = intern(&heap, &mut strings, "world");
        assert!(!ptr::eq(first, other));
    }

    #[test]
    fn concatenation_reuses_an_existing_interned_string() {
        let heap = Arena::new();
        let mut strings = Table::new();
        let whole = intern(&heap, &mut strings, "abc");
        let ab = intern(&heap, &mut strings, "ab");
        let c = intern(&heap, &mut strings, "c");
        let joined = concatenate(&heap, &mut strings, ab, c);
        assert_eq!(joined.chars, "abc");
        assert!(ptr::eq(whole, joined));
    }
}
