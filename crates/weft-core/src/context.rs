//! Apply-time scope chain.
//!
//! A [`Meta`](crate::change::Meta) change binds its data into the context for
//! the duration of applying its inner change. Built-in values ignore the
//! context; custom changes receive it in
//! [`CustomChange::apply_to`](crate::change::CustomChange::apply_to) and can
//! read tags such as the author of an edit.

use serde_json::Value as Json;

/// A linked chain of meta scopes, innermost first.
#[derive(Clone, Copy, Debug, Default)]
pub struct Context<'a> {
    data: Option<&'a Json>,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    /// The empty root context.
    pub fn root() -> Self {
        Self::default()
    }

    /// Create a child scope carrying `data`.
    pub fn with<'b>(&'b self, data: &'b Json) -> Context<'b> {
        Context {
            data: Some(data),
            parent: Some(self),
        }
    }

    /// Meta data from the innermost scope outward.
    pub fn scopes(&self) -> impl Iterator<Item = &'a Json> + '_ {
        std::iter::successors(Some(self), |c| c.parent).filter_map(|c| c.data)
    }

    /// Look up `key` in the innermost scope whose data is an object holding it.
    pub fn lookup(&self, key: &str) -> Option<&'a Json> {
        self.scopes().find_map(|data| data.get(key))
    }

    /// Number of scopes on the chain.
    pub fn depth(&self) -> usize {
        self.scopes().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_prefers_innermost_scope() {
        let outer = json!({"author": "alice", "tag": 1});
        let inner = json!({"author": "bob"});

        let root = Context::root();
        let ctx1 = root.with(&outer);
        let ctx2 = ctx1.with(&inner);

        assert_eq!(ctx2.lookup("author"), Some(&json!("bob")));
        assert_eq!(ctx2.lookup("tag"), Some(&json!(1)));
        assert_eq!(ctx2.lookup("missing"), None);
        assert_eq!(ctx2.depth(), 2);
        assert_eq!(root.depth(), 0);
    }
}
