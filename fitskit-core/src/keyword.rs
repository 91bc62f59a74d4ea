//! Keyword handles and the shared keyword registry
//!
//! Cards refer to their keyword through a [`KeyRef`], an interned handle
//! handed out by a [`KeywordRegistry`]. The registry is read-mostly: lookups
//! take a shared lock, and only a miss takes the write lock and re-checks
//! before inserting, so concurrent first use of a new keyword creates a
//! single handle.

use core::borrow::Borrow;
use core::fmt;
use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use parking_lot::RwLock;

/// Interned keyword text
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyRef(Arc<str>);

impl KeyRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Same handle object as `other`
    pub fn ptr_eq(&self, other: &KeyRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// True for keywords that follow the HIERARCH convention
    pub fn is_hierarch(&self) -> bool {
        self.0.starts_with(HIERARCH_PREFIX)
    }

    /// True for COMMENT, HISTORY and the blank keyword
    pub fn is_commentary(&self) -> bool {
        is_commentary(&self.0)
    }
}

impl fmt::Debug for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyRef({:?})", &*self.0)
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KeyRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for KeyRef {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Dot-joined prefix of hierarchical keywords
pub const HIERARCH_PREFIX: &str = "HIERARCH.";

/// Structural keyword names used by the core
pub mod std_keys {
    pub const SIMPLE: &str = "SIMPLE";
    pub const XTENSION: &str = "XTENSION";
    pub const BITPIX: &str = "BITPIX";
    pub const NAXIS: &str = "NAXIS";
    /// Template for `NAXIS1`, `NAXIS2`, ...
    pub const NAXISN: &str = "NAXISn";
    pub const EXTEND: &str = "EXTEND";
    pub const PCOUNT: &str = "PCOUNT";
    pub const GCOUNT: &str = "GCOUNT";
    pub const GROUPS: &str = "GROUPS";
    pub const TFIELDS: &str = "TFIELDS";
    pub const THEAP: &str = "THEAP";
    pub const END: &str = "END";
    pub const COMMENT: &str = "COMMENT";
    pub const HISTORY: &str = "HISTORY";
    pub const CONTINUE: &str = "CONTINUE";
    pub const LONGSTRN: &str = "LONGSTRN";
    pub const HIERARCH: &str = "HIERARCH";
    pub const BLANK: &str = "";
}

/// True for keywords whose cards never carry a value
pub fn is_commentary(key: &str) -> bool {
    matches!(key, std_keys::COMMENT | std_keys::HISTORY | std_keys::BLANK)
}

/// Substitute each lowercase `n` in `template` with the next index
///
/// Placeholders beyond the supplied indices are left as they are.
pub fn expand_indexed(template: &str, indices: &[usize]) -> String {
    let mut out = String::with_capacity(template.len() + indices.len() * 2);
    let mut rest = indices.iter();
    for ch in template.chars() {
        match ch {
            'n' => match rest.next() {
                Some(i) => out.push_str(&i.to_string()),
                None => out.push('n'),
            },
            c => out.push(c),
        }
    }
    out
}

/// Process-wide or private map from keyword text to [`KeyRef`]
#[derive(Debug, Default)]
pub struct KeywordRegistry {
    keys: RwLock<HashMap<Arc<str>, KeyRef>>,
}

impl KeywordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the structural keywords
    pub fn with_standard_keys() -> Self {
        let registry = Self::new();
        for key in [
            std_keys::SIMPLE,
            std_keys::XTENSION,
            std_keys::BITPIX,
            std_keys::NAXIS,
            std_keys::EXTEND,
            std_keys::PCOUNT,
            std_keys::GCOUNT,
            std_keys::GROUPS,
            std_keys::TFIELDS,
            std_keys::THEAP,
            std_keys::END,
            std_keys::COMMENT,
            std_keys::HISTORY,
            std_keys::CONTINUE,
            std_keys::LONGSTRN,
            std_keys::BLANK,
        ] {
            registry.resolve_or_create(key);
        }
        registry
    }

    /// Shared registry created on first use
    pub fn global() -> Arc<KeywordRegistry> {
        static GLOBAL: OnceLock<Arc<KeywordRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(KeywordRegistry::with_standard_keys()))
            .clone()
    }

    /// Handle for `text`, registering it when unseen
    pub fn resolve_or_create(&self, text: &str) -> KeyRef {
        if let Some(key) = self.keys.read().get(text) {
            return key.clone();
        }

        let mut keys = self.keys.write();
        if let Some(key) = keys.get(text) {
            return key.clone();
        }
        let interned: Arc<str> = Arc::from(text);
        let key = KeyRef(interned.clone());
        keys.insert(interned, key.clone());
        tracing::trace!(keyword = text, "registered keyword");
        key
    }

    /// Handle for an already registered keyword
    pub fn lookup(&self, text: &str) -> Option<KeyRef> {
        self.keys.read().get(text).cloned()
    }

    /// Handle for an indexed keyword such as `NAXISn` with `[2]`
    pub fn indexed(&self, template: &str, indices: &[usize]) -> KeyRef {
        self.resolve_or_create(&expand_indexed(template, indices))
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_resolve_returns_same_handle() {
        let registry = KeywordRegistry::new();
        let a = registry.resolve_or_create("OBJECT");
        let b = registry.resolve_or_create("OBJECT");
        assert!(a.ptr_eq(&b));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("OBJECT"), Some(a));
        assert_eq!(registry.lookup("MISSING"), None);
    }

    #[test]
    fn test_indexed() {
        let registry = KeywordRegistry::new();
        assert_eq!(registry.indexed(std_keys::NAXISN, &[2]).as_str(), "NAXIS2");
        assert_eq!(expand_indexed("TDIMn", &[12]), "TDIM12");
        assert_eq!(expand_indexed("PVn_n", &[1, 3]), "PV1_3");
        assert_eq!(expand_indexed("CDn_n", &[1]), "CD1_n");
    }

    #[test]
    fn test_commentary_and_hierarch() {
        let registry = KeywordRegistry::with_standard_keys();
        assert!(registry.resolve_or_create("HISTORY").is_commentary());
        assert!(!registry.resolve_or_create("CONTINUE").is_commentary());
        assert!(registry.resolve_or_create("HIERARCH.ESO.DET").is_hierarch());
    }

    #[test]
    fn test_concurrent_first_use() {
        let registry = Arc::new(KeywordRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.resolve_or_create("NEWKEY"))
            })
            .collect();
        let keys: Vec<KeyRef> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(keys.windows(2).all(|w| w[0].ptr_eq(&w[1])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_global_is_shared() {
        let a = KeywordRegistry::global();
        let b = KeywordRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.lookup(std_keys::SIMPLE).is_some());
    }
}
