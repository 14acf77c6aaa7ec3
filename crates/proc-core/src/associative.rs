//! Key-based lookup capability
//!
//! Any container that can answer "what is stored under this key" implements
//! [`Associative`]. Bulk assignment is optional: containers that cannot be
//! replaced wholesale keep the default `store`, which reports a usage error.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::error::{ProcError, Result};

pub trait Associative {
    type Key;
    type Value;

    /// Value stored under `key`, if any
    fn get<Q>(&self, key: &Q) -> Option<&Self::Value>
    where
        Self::Key: Borrow<Q>,
        Q: Hash + Ord + Eq + ?Sized;

    /// Whether `key` exists
    fn has<Q>(&self, key: &Q) -> bool
    where
        Self::Key: Borrow<Q>,
        Q: Hash + Ord + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Replace all contents with `entries`
    fn store<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (Self::Key, Self::Value)>,
    {
        let _ = entries;
        Err(ProcError::Usage(
            "this container does not support bulk assignment".to_string(),
        ))
    }
}

impl<K: Hash + Eq, V> Associative for HashMap<K, V> {
    type Key = K;
    type Value = V;

    fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Ord + Eq + ?Sized,
    {
        HashMap::get(self, key)
    }

    fn store<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.clear();
        self.extend(entries);
        Ok(())
    }
}

impl<K: Ord, V> Associative for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Ord + Eq + ?Sized,
    {
        BTreeMap::get(self, key)
    }

    fn store<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.clear();
        self.extend(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed lookup table without bulk assignment
    struct Fixed;

    impl Associative for Fixed {
        type Key = String;
        type Value = i32;

        fn get<Q>(&self, key: &Q) -> Option<&i32>
        where
            String: Borrow<Q>,
            Q: Hash + Ord + Eq + ?Sized,
        {
            const ANSWER: i32 = 42;
            let answer = String::from("answer");
            let probe: &Q = answer.borrow();
            if probe == key {
                Some(&ANSWER)
            } else {
                None
            }
        }
    }

    fn lookup<A>(container: &A, key: &str) -> Option<i32>
    where
        A: Associative<Key = String, Value = i32>,
    {
        container.get(key).copied()
    }

    #[test]
    fn hashmap_get_and_has() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1);
        assert_eq!(lookup(&map, "a"), Some(1));
        assert!(Associative::has(&map, "a"));
        assert!(!Associative::has(&map, "b"));
    }

    #[test]
    fn btreemap_store_replaces_contents() {
        let mut map = BTreeMap::new();
        map.insert("old".to_string(), 0);
        map.store(vec![("x".to_string(), 1), ("y".to_string(), 2)])
            .unwrap();
        assert!(!Associative::has(&map, "old"));
        assert_eq!(lookup(&map, "y"), Some(2));
    }

    #[test]
    fn default_store_is_usage_error() {
        let mut fixed = Fixed;
        assert_eq!(lookup(&fixed, "answer"), Some(42));
        assert!(fixed.has("answer"));
        let err = fixed.store(vec![("k".to_string(), 1)]).unwrap_err();
        assert!(matches!(err, ProcError::Usage(_)));
    }
}
