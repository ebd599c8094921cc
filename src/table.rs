use std::ptr;

use crate::object::ObjString;
use crate::value::Value;

const TABLE_MAX_LOAD: f64 = 0.75;
const TABLE_MIN_CAPACITY: usize = 32;

/// A slot in the probe sequence. Three states:
/// - never used: `key` is `None`, `value` is `Nil`;
/// - live: `key` is `Some`;
/// - tombstone: `key` is `None`, `value` is `Bool(true)`. Deleted slots stay
///   occupied so probe chains for later entries keep working.
#[derive(Copy, Clone)]
struct Entry<'heap> {
    key: Option<&'heap ObjString>,
    value: Value<'heap>,
}

/// Open-addressing hash table with linear probing, keyed by interned strings
/// (identity comparison). Backs both the string intern set and the global
/// variable bindings.
pub struct Table<'heap> {
    /// Live entries plus tombstones; reset to the live count on resize.
    count: usize,
    entries: Vec<Entry<'heap>>,
}

impl<'heap> Table<'heap> {
    pub fn new() -> Self {
        Table {
            count: 0,
            entries: Vec::new(),
        }
    }

    /// Inserts or overwrites. Returns true when the key was not present.
    pub fn set(&mut self, key: &'heap ObjString, value: Value<'heap>) -> bool {
        if self.entries.is_empty() {
            self.adjust_capacity(TABLE_MIN_CAPACITY);
        }
        if (self.count + 1) as f64 > self.entries.len() as f64 * TABLE_MAX_LOAD {
            let capacity = self.entries.len() * 2;
            self.adjust_capacity(capacity);
        }

        let index = find_slot(&self.entries, key);
        let entry = &mut self.entries[index];
        let is_new_key = entry.key.is_none();
        // Claiming a tombstone does not change the count: the slot was
        // already accounted for.
        if is_new_key && entry.value.is_nil() {
            self.count += 1;
        }

        entry.key = Some(key);
        entry.value = value;
        is_new_key
    }

    pub fn get(&self, key: &ObjString) -> Option<Value<'heap>> {
        if self.count == 0 {
            return None;
        }

        let entry = &self.entries[find_slot(&self.entries, key)];
        entry.key.map(|_| entry.value)
    }

    /// Marks the slot as a tombstone rather than vacating it.
    pub fn delete(&mut self, key: &ObjString) -> bool {
        if self.count == 0 {
            return false;
        }

        let index = find_slot(&self.entries, key);
        let entry = &mut self.entries[index];
        if entry.key.is_none() {
            return false;
        }

        entry.key = None;
        entry.value = Value::Bool(true);
        true
    }

    /// Content-equality lookup used to dedupe strings before allocating a
    /// candidate object. Probes by the precomputed hash and compares bytes
    /// only when the hashes agree.
    pub fn find_interned(&self, chars: &str, hash: u32) -> Option<&'heap ObjString> {
        if self.count == 0 {
            return None;
        }

        let capacity = self.entries.len();
        let mut index = hash as usize % capacity;
        loop {
            let entry = &self.entries[index];
            match entry.key {
                None => {
                    // A truly empty slot ends the probe chain; skip over
                    // tombstones.
                    if entry.value.is_nil() {
                        return None;
                    }
                }
                Some(key) => {
                    if key.hash == hash && key.chars == chars {
                        return Some(key);
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }

    fn adjust_capacity(&mut self, capacity: usize) {
        let mut entries = vec![
            Entry {
                key: None,
                value: Value::Nil,
            };
            capacity
        ];

        // Rehash every live entry; tombstones are dropped here.
        self.count = 0;
        for entry in &self.entries {
            if let Some(key) = entry.key {
                let dest = find_slot(&entries, key);
                entries[dest] = *entry;
                self.count += 1;
            }
        }

        self.entries = entries;
    }
}

/// Returns the slot holding `key`, or the slot an insert of `key` should use.
/// The first tombstone seen along the probe path is preferred over a fresh
/// empty slot, so delete/insert cycles reclaim space.
fn find_slot(entries: &[Entry<'_>], key: &ObjString) -> usize {
    let capacity = entries.len();
    let mut index = key.hash as usize % capacity;
    let mut tombstone: Option<usize> = None;
    loop {
        let entry = &entries[index];
        match entry.key {
            None => {
                if entry.value.is_nil() {
                    return tombstone.unwrap_or(index);
                }
                if tombstone.is_none() {
                    tombstone = Some(index);
                }
            }
            Some(existing) => {
                if ptr::eq(existing, key) {
                    return index;
                }
            }
        }
        index = (index + 1) % capacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(chars: &str) -> ObjString {
        ObjString::new(chars)
    }

    // Keys with a forced hash, for steering probe sequences in tests.
    fn colliding_key(chars: &str, hash: u32) -> ObjString {
        ObjString {
            chars: chars.to_owned(),
            hash,
        }
    }

    #[test]
    fn get_after_set_returns_the_value() {
        let a = key("a");
        let mut table = Table::new();
        assert!(table.set(&a, Value::Number(1.0)));
        assert_eq!(table.get(&a), Some(Value::Number(1.0)));
    }

    #[test]
    fn overwriting_returns_false_and_replaces() {
        let a = key("a");
        let mut table = Table::new();
        table.set(&a, Value::Number(1.0));
        assert!(!table.set(&a, Value::Number(2.0)));
        assert_eq!(table.get(&a), Some(Value::Number(2.0)));
    }

    #[test]
    fn get_of_a_missing_key_is_none() {
        let a = key("a");
        let b = key("b");
        let mut table = Table::new();
        assert_eq!(table.get(&a), None);
        table.set(&a, Value::Nil);
        assert_eq!(table.get(&b), None);
        // A live entry whose value is nil is still present.
        assert_eq!(table.get(&a), Some(Value::Nil));
    }

    #[test]
    fn delete_removes_only_the_given_key() {
        let a = key("a");
        let b = key("b");
        let mut table = Table::new();
        table.set(&a, Value::Number(1.0));
        table.set(&b, Value::Number(2.0));
        assert!(table.delete(&a));
        assert!(!table.delete(&a));
        assert_eq!(table.get(&a), None);
        assert_eq!(table.get(&b), Some(Value::Number(2.0)));
    }

    #[test]
    fn probing_continues_through_tombstones() {
        // Three keys on the same probe chain; deleting the middle one must
        // not hide the one behind it.
        let first = colliding_key("first", 7);
        let second = colliding_key("second", 7);
        let third = colliding_key("third", 7);
        let mut table = Table::new();
        table.set(&first, Value::Number(1.0));
        table.set(&second, Value::Number(2.0));
        table.set(&third, Value::Number(3.0));

        assert!(table.delete(&second));
        assert_eq!(table.get(&first), Some(Value::Number(1.0)));
        assert_eq!(table.get(&third), Some(Value::Number(3.0)));
    }

    #[test]
    fn inserts_reuse_tombstones() {
        let first = colliding_key("first", 7);
        let second = colliding_key("second", 7);
        let replacement = colliding_key("replacement", 7);
        let mut table = Table::new();
        table.set(&first, Value::Number(1.0));
        table.set(&second, Value::Number(2.0));
        table.delete(&first);
        assert!(table.set(&replacement, Value::Number(3.0)));
        assert_eq!(table.get(&replacement), Some(Value::Number(3.0)));
        assert_eq!(table.get(&second), Some(Value::Number(2.0)));
    }

    #[test]
    fn resize_preserves_all_live_entries() {
        let keys: Vec<ObjString> = (0..100).map(|i| key(&format!("key{}", i))).collect();
        let mut table = Table::new();
        for (i, k) in keys.iter().enumerate() {
            table.set(k, Value::Number(i as f64));
        }
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(table.get(k), Some(Value::Number(i as f64)));
        }
    }

    #[test]
    fn find_interned_matches_by_content() {
        let abc = key("abc");
        let mut table = Table::new();
        table.set(&abc, Value::Nil);

        let found = table.find_interned("abc", abc.hash).unwrap();
        assert!(std::ptr::eq(found, &abc));
        assert!(table.find_interned("abd", hash_of("abd")).is_none());
    }

    #[test]
    fn find_interned_skips_tombstones() {
        let first = colliding_key("first", 7);
        let second = colliding_key("second", 7);
        let mut table = Table::new();
        table.set(&first, Value::Nil);
        table.set(&second, Value::Nil);
        table.delete(&first);

        let found = table.find_interned("second", 7).unwrap();
        assert!(std::ptr::eq(found, &second));
        assert!(table.find_interned("first", 7).is_none());
    }

    fn hash_of(chars: &str) -> u32 {
        crate::object::hash_string(chars)
    }
}
