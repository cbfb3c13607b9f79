use super::Merged;
use crate::error::{ChangeError, Result};
use crate::value::{Key, Value};

/// Replace the region `[offset, offset + count(before))` of a sequence with
/// `after`. An empty `before` inserts; an empty `after` deletes.
#[derive(Clone, Debug, PartialEq)]
pub struct Splice {
    pub offset: usize,
    pub before: Value,
    pub after: Value,
}

impl Splice {
    pub fn new(offset: usize, before: Value, after: Value) -> Self {
        Self {
            offset,
            before,
            after,
        }
    }

    pub fn revert(&self) -> Splice {
        Splice::new(self.offset, self.after.clone(), self.before.clone())
    }

    /// One past the last element of the replaced region.
    pub fn end(&self) -> Result<usize> {
        self.offset
            .checked_add(self.before.count()?)
            .ok_or_else(|| ChangeError::illegal(format!("splice at {} overflows", self.offset)))
    }

    /// Position of element `index` after the splice; `None` if it was removed.
    pub fn map_index(&self, index: usize) -> Result<Option<usize>> {
        let end = self.end()?;
        if index < self.offset {
            Ok(Some(index))
        } else if index >= end {
            Ok(Some(index - (end - self.offset) + self.after.count()?))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn map_path(&self, path: &[Key]) -> Result<Option<Vec<Key>>> {
        match path.split_first() {
            Some((Key::Index(i), rest)) => Ok(self.map_index(*i)?.map(|i| {
                let mut mapped = Vec::with_capacity(path.len());
                mapped.push(Key::Index(i));
                mapped.extend_from_slice(rest);
                mapped
            })),
            _ => Ok(Some(path.to_vec())),
        }
    }

    /// Splice against splice, keyed on how the two regions overlap.
    pub(crate) fn merge_splice(&self, other: &Splice) -> Result<Merged> {
        let (sstart, send) = (self.offset, self.end()?);
        let (ostart, oend) = (other.offset, other.end()?);
        let mut s = self.clone();
        let mut o = other.clone();

        if send <= ostart {
            o.offset = ostart - (send - sstart) + self.after.count()?;
        } else if sstart >= oend {
            s.offset = sstart - (oend - ostart) + other.after.count()?;
        } else if sstart < ostart && send < oend {
            o.before = other.before.slice(send - ostart, oend - send)?;
            o.offset = sstart + self.after.count()?;
            s.before = self.before.slice(0, ostart - sstart)?;
        } else if sstart == ostart && send < oend {
            o.before = other.before.splice(&Splice::new(
                0,
                self.before.clone(),
                self.after.clone(),
            ))?;
            return Ok((Some(o.into()), None));
        } else if sstart <= ostart && send >= oend {
            s.before = self.before.splice(&Splice::new(
                ostart - sstart,
                other.before.clone(),
                other.after.clone(),
            ))?;
            return Ok((None, Some(s.into())));
        } else if send <= oend {
            o.before = other.before.splice(&Splice::new(
                sstart - ostart,
                self.before.clone(),
                self.after.clone(),
            ))?;
            return Ok((Some(o.into()), None));
        } else {
            s.before = self.before.slice(oend - sstart, send - oend)?;
            s.offset = ostart + other.after.count()?;
            o.before = other.before.slice(0, sstart - ostart)?;
        }
        Ok((Some(o.into()), Some(s.into())))
    }
}
