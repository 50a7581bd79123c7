//! Child lists: insertion-ordered, uid-scoped collections owned by a root.
//!
//! Uids are allocated by scanning the live children for the lowest unused
//! value, so freed uids are reused by the next insertion.

use rustc_hash::FxHashSet;

use crate::name::Key;

/// Per-list unique identifier of a child.
pub type Uid = u32;

/// Anything that can live in a [`ChildList`].
pub trait Child {
    fn name(&self) -> &str;
    fn uid(&self) -> Uid;
    /// Called once by [`ChildList::install`] with the allocated uid.
    fn set_uid(&mut self, uid: Uid);
}

/// Owned children of one kind, kept in insertion order.
#[derive(Debug)]
pub struct ChildList<T> {
    children: Vec<T>,
}

impl<T: Child> ChildList<T> {
    pub fn new() -> Self {
        Self { children: Vec::new() }
    }

    /// Lowest non-negative uid not held by a live child.
    pub fn lowest_free_uid(&self) -> Uid {
        let used: FxHashSet<Uid> = self.children.iter().map(Child::uid).collect();
        let mut uid = 0;
        while used.contains(&uid) {
            uid += 1;
        }
        uid
    }

    /// Assign the lowest free uid to `child` and append it.
    pub fn install(&mut self, mut child: T) -> Uid {
        let uid = self.lowest_free_uid();
        child.set_uid(uid);
        self.children.push(child);
        uid
    }

    /// Remove and return the child with the given uid.
    pub fn remove(&mut self, uid: Uid) -> Option<T> {
        let index = self.children.iter().position(|c| c.uid() == uid)?;
        Some(self.children.remove(index))
    }

    /// First child with the given name.
    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.children.iter().find(|c| c.name() == name)
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut T> {
        self.children.iter_mut().find(|c| c.name() == name)
    }

    pub fn get_by_uid(&self, uid: Uid) -> Option<&T> {
        self.children.iter().find(|c| c.uid() == uid)
    }

    pub fn get_by_uid_mut(&mut self, uid: Uid) -> Option<&mut T> {
        self.children.iter_mut().find(|c| c.uid() == uid)
    }

    /// Resolve a key by name or by `__<uid>`.
    pub fn get(&self, key: &str) -> Option<&T> {
        match Key::parse(key) {
            Key::Uid(uid) => uid.and_then(|uid| self.get_by_uid(uid)),
            Key::Name(name) => self.get_by_name(name),
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match Key::parse(key) {
            Key::Uid(uid) => uid.and_then(|uid| self.get_by_uid_mut(uid)),
            Key::Name(name) => self.get_by_name_mut(name),
        }
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.get_by_name(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.children.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.children.iter_mut()
    }

    /// Uids of all live children, in insertion order.
    pub fn uids(&self) -> Vec<Uid> {
        self.children.iter().map(Child::uid).collect()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<T: Child> Default for ChildList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::uid_key;

    #[derive(Debug)]
    struct Item {
        name: String,
        uid: Uid,
    }

    impl Item {
        fn new(name: &str) -> Self {
            Self { name: name.to_string(), uid: Uid::MAX }
        }
    }

    impl Child for Item {
        fn name(&self) -> &str {
            &self.name
        }
        fn uid(&self) -> Uid {
            self.uid
        }
        fn set_uid(&mut self, uid: Uid) {
            self.uid = uid;
        }
    }

    #[test]
    fn install_assigns_sequential_uids() {
        let mut list = ChildList::new();
        assert_eq!(list.install(Item::new("a")), 0);
        assert_eq!(list.install(Item::new("b")), 1);
        assert_eq!(list.install(Item::new("c")), 2);
        assert_eq!(list.get_by_name("b").map(|i| i.uid), Some(1));
    }

    #[test]
    fn removed_uid_is_reused() {
        let mut list = ChildList::new();
        list.install(Item::new("a"));
        list.install(Item::new("b"));
        list.install(Item::new("c"));

        let removed = list.remove(1).unwrap();
        assert_eq!(removed.name, "b");
        assert_eq!(list.install(Item::new("d")), 1);
        assert_eq!(list.install(Item::new("e")), 3);
    }

    #[test]
    fn lowest_gap_wins() {
        let mut list = ChildList::new();
        for name in ["a", "b", "c", "d"] {
            list.install(Item::new(name));
        }
        list.remove(2);
        list.remove(0);
        assert_eq!(list.install(Item::new("x")), 0);
        assert_eq!(list.install(Item::new("y")), 2);
        assert_eq!(list.install(Item::new("z")), 4);
    }

    #[test]
    fn get_resolves_uid_keys() {
        let mut list = ChildList::new();
        list.install(Item::new("a"));
        list.install(Item::new("b"));

        assert_eq!(list.get(&uid_key(1)).map(|i| i.name.as_str()), Some("b"));
        assert_eq!(list.get("a").map(|i| i.uid), Some(0));
        assert!(list.get("__9").is_none());
        assert!(list.get("__99999999999999999999").is_none());
        assert!(list.get("missing").is_none());
    }

    #[test]
    fn name_lookup_prefers_first_inserted() {
        let mut list = ChildList::new();
        list.install(Item::new("dup"));
        list.install(Item::new("dup"));
        assert_eq!(list.get_by_name("dup").map(|i| i.uid), Some(0));
    }

    #[test]
    fn remove_missing_uid_is_none() {
        let mut list: ChildList<Item> = ChildList::new();
        assert!(list.remove(0).is_none());
        assert!(list.is_empty());
    }
}
