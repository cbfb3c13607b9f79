use super::{Change, Merged, Splice};
use crate::error::{ChangeError, Result};
use crate::value::Key;

/// Apply `change` at the descendant addressed by `path`.
#[derive(Clone, Debug, PartialEq)]
pub struct PathChange {
    pub path: Vec<Key>,
    pub change: Box<Change>,
}

impl PathChange {
    pub fn new(path: Vec<Key>, change: Change) -> Self {
        Self {
            path,
            change: Box::new(change),
        }
    }

    pub fn revert(&self) -> PathChange {
        PathChange::new(self.path.clone(), self.change.revert())
    }

    pub fn simplify(self) -> Option<Change> {
        let inner = (*self.change).simplify()?;
        Some(wrap(self.path, inner))
    }

    pub(crate) fn map_path(&self, path: &[Key]) -> Result<Option<Vec<Key>>> {
        let Some(rest) = path.strip_prefix(self.path.as_slice()) else {
            return Ok(Some(path.to_vec()));
        };
        Ok(self
            .change
            .map_path(rest)?
            .map(|mapped| self.path.iter().cloned().chain(mapped).collect()))
    }

    /// The change relative to the first `depth` keys of its path.
    fn relative(&self, depth: usize) -> Change {
        if depth == self.path.len() {
            (*self.change).clone()
        } else {
            PathChange::new(self.path[depth..].to_vec(), (*self.change).clone()).into()
        }
    }
}

/// Prefix `change` with `path`, flattening nested path changes.
fn wrap(mut path: Vec<Key>, change: Change) -> Change {
    match change {
        _ if path.is_empty() => change,
        Change::Path(nested) => {
            path.extend(nested.path);
            Change::Path(PathChange {
                path,
                change: nested.change,
            })
        }
        other => PathChange::new(path, other).into(),
    }
}

/// Two path changes. Diverging paths commute; otherwise the changes are
/// merged relative to their common prefix.
pub(crate) fn merge_paths(s: &PathChange, o: &PathChange) -> Result<Merged> {
    let depth = s
        .path
        .iter()
        .zip(&o.path)
        .take_while(|(a, b)| a == b)
        .count();
    if depth < s.path.len() && depth < o.path.len() {
        return Ok((Some(o.clone().into()), Some(s.clone().into())));
    }
    let prefix = &s.path[..depth];
    let (o2, s2) = s.relative(depth).merge(&o.relative(depth))?;
    Ok((
        o2.map(|c| wrap(prefix.to_vec(), c)),
        s2.map(|c| wrap(prefix.to_vec(), c)),
    ))
}

/// A root-level replace, splice or move against a change to one of its
/// descendants. Returns `(pc', root')`.
///
/// If the descendant survives `root` the nested change is re-addressed;
/// otherwise it is folded into `root`'s `before` and disappears.
pub(crate) fn descend(root: &Change, pc: &PathChange) -> Result<Merged> {
    if let Some(path) = root.map_path(&pc.path)? {
        let moved = PathChange::new(path, (*pc.change).clone());
        return Ok((Some(moved.into()), Some(root.clone())));
    }
    match (root, pc.path.split_first()) {
        (Change::Replace(r), _) => {
            let absorbed = r.absorb(&Change::Path(pc.clone()))?;
            Ok((None, Some(absorbed.into())))
        }
        (Change::Splice(s), Some((Key::Index(i), rest))) => {
            let mut path = Vec::with_capacity(pc.path.len());
            path.push(Key::Index(i - s.offset));
            path.extend_from_slice(rest);
            let nested = PathChange::new(path, (*pc.change).clone());
            let before = s.before.apply(&nested.into())?;
            let absorbed = Splice::new(s.offset, before, s.after.clone());
            Ok((None, Some(absorbed.into())))
        }
        _ => Err(ChangeError::illegal(format!(
            "cannot merge {:?} with nested change at {:?}",
            root, pc.path
        ))),
    }
}
