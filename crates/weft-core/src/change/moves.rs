use super::{Change, ChangeSet, Merged, Splice};
use crate::error::Result;
use crate::value::Key;

/// Shift the window `[offset, offset + count)` of a sequence by `distance`.
///
/// Internally every move is handled as a swap of two adjacent blocks
/// `[a, mid)` and `[mid, b)`; see [`Move::span`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub offset: usize,
    pub count: usize,
    pub distance: isize,
}

impl Move {
    pub fn new(offset: usize, count: usize, distance: isize) -> Self {
        Self {
            offset,
            count,
            distance,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.count == 0 || self.distance == 0
    }

    pub fn revert(&self) -> Move {
        Move::new(
            self.offset.wrapping_add_signed(self.distance),
            self.count,
            -self.distance,
        )
    }

    /// Where the moved window lands, as a boundary in the original sequence.
    pub fn dest(&self) -> usize {
        if self.distance >= 0 {
            self.offset
                .saturating_add(self.count)
                .saturating_add(self.distance.unsigned_abs())
        } else {
            self.offset.saturating_sub(self.distance.unsigned_abs())
        }
    }

    /// Strictly inside the moved window.
    pub fn contains(&self, index: usize) -> bool {
        self.offset < index && index < self.offset.saturating_add(self.count)
    }

    /// The move as a block swap `(a, mid, b)`: `[a, mid)` and `[mid, b)`
    /// trade places. `None` for a move that reaches below zero or past
    /// `usize::MAX`.
    pub fn span(&self) -> Option<(usize, usize, usize)> {
        let d = self.distance.unsigned_abs();
        let end = self.offset.checked_add(self.count)?;
        if self.distance >= 0 {
            Some((self.offset, end, end.checked_add(d)?))
        } else {
            let a = self.offset.checked_sub(d)?;
            Some((a, self.offset, end))
        }
    }

    /// Build the move swapping `[a, mid)` with `[mid, b)`. When `rightward`
    /// the left block is the one described as moving. `None` if either
    /// block is empty.
    pub fn from_span(a: usize, mid: usize, b: usize, rightward: bool) -> Option<Move> {
        if a >= mid || mid >= b {
            return None;
        }
        if rightward {
            Some(Move::new(a, mid - a, (b - mid) as isize))
        } else {
            Some(Move::new(mid, b - mid, -((mid - a) as isize)))
        }
    }

    /// New position of the element at `index`.
    pub fn map_index(&self, index: usize) -> usize {
        match self.span() {
            Some((a, mid, b)) if a <= index && index < mid => index + (b - mid),
            Some((a, mid, b)) if mid <= index && index < b => index - (mid - a),
            _ => index,
        }
    }

    /// New position of the boundary before element `point`. Boundaries at
    /// either end of the swapped region stay put.
    pub fn map_point(&self, point: usize) -> usize {
        match self.span() {
            Some((a, _, b)) if a < point && point < b => self.map_index(point),
            _ => point,
        }
    }

    pub(crate) fn map_path(&self, path: &[Key]) -> Vec<Key> {
        match path.split_first() {
            Some((Key::Index(i), rest)) => {
                let mut mapped = Vec::with_capacity(path.len());
                mapped.push(Key::Index(self.map_index(*i)));
                mapped.extend_from_slice(rest);
                mapped
            }
            _ => path.to_vec(),
        }
    }

    fn shifted(&self, delta: isize) -> Move {
        Move::new(self.offset.wrapping_add_signed(delta), self.count, self.distance)
    }

    fn rightward(&self) -> bool {
        self.distance > 0
    }

    /// Move against a concurrent splice. Returns `(splice', move')`.
    pub(crate) fn merge_splice(&self, splice: &Splice) -> Result<Merged> {
        let Some((a, mid, b)) = self.span().filter(|_| !self.is_noop()) else {
            return Ok((Some(splice.clone().into()), None));
        };
        let (p, q) = (splice.offset, splice.end()?);
        let n_after = splice.after.count()?;
        let resize = |x: usize| x - (q - p) + n_after;
        let rebuild = |a, mid, b| Move::from_span(a, mid, b, self.rightward()).map(Change::Move);
        let (n_left, n_right) = (mid - a, b - mid);

        if q <= a {
            return Ok((
                Some(splice.clone().into()),
                rebuild(resize(a), resize(mid), resize(b)),
            ));
        }
        if p >= b {
            return Ok((Some(splice.clone().into()), Some((*self).into())));
        }
        if p <= a && q >= b {
            let inner = Move::new(self.offset - p, self.count, self.distance);
            let before = splice.before.rotate(&inner)?;
            let absorbed = Splice::new(p, before, splice.after.clone());
            return Ok((Some(absorbed.into()), None));
        }
        if a <= p && q <= mid {
            let moved = Splice::new(p + n_right, splice.before.clone(), splice.after.clone());
            return Ok((Some(moved.into()), rebuild(a, resize(mid), resize(b))));
        }
        if mid <= p && q <= b {
            let moved = Splice::new(p - n_left, splice.before.clone(), splice.after.clone());
            return Ok((Some(moved.into()), rebuild(a, mid, resize(b))));
        }

        // The splice straddles a block boundary. Its pieces are deleted
        // where the move put them and `after` is inserted where the rebased
        // move carries it, so the splice side never gains a move.
        let point = |x: usize| {
            if x <= p {
                x
            } else if x >= q {
                resize(x)
            } else {
                p
            }
        };
        let (a2, mid2, b2) = (point(a), point(mid), point(b));
        let at = if a2 <= p && p < mid2 {
            p + (b2 - mid2)
        } else if mid2 <= p && p < b2 {
            p - (mid2 - a2)
        } else {
            p
        };

        // (start, end, start once moved), in moved order.
        let segments = [
            (0, a, 0),
            (mid, b, a),
            (a, mid, a + n_right),
            (b, usize::MAX, b),
        ];
        let mut pieces = Vec::with_capacity(segments.len());
        let mut removed = 0;
        for (lo, hi, to) in segments {
            let (s, e) = (lo.max(p), hi.min(q));
            if s < e {
                let offset = to + (s - lo);
                pieces.push((offset, offset - removed, splice.before.slice(s - p, e - s)?));
                removed += e - s;
            }
        }

        let empty = splice.before.empty_like()?;
        let mut inserted = n_after == 0;
        let mut parts = Vec::with_capacity(pieces.len() + 1);
        for (offset, settled, before) in pieces.into_iter().rev() {
            let after = if !inserted && settled == at {
                inserted = true;
                splice.after.clone()
            } else {
                empty.clone()
            };
            parts.push(Change::Splice(Splice::new(offset, before, after)));
        }
        if !inserted {
            parts.push(Change::Splice(Splice::new(at, empty, splice.after.clone())));
        }
        Ok((ChangeSet::new(parts).simplify(), rebuild(a2, mid2, b2)))
    }

    /// Move against a concurrent move. Returns `(other', self')`.
    pub(crate) fn merge_move(&self, other: &Move) -> Merged {
        let (Some(s), Some(o)) = (self.span(), other.span()) else {
            return (Some((*other).into()), Some((*self).into()));
        };
        if s == o {
            return (None, None);
        }
        let (a1, m1, b1) = s;
        let (a2, m2, b2) = o;
        let keep = |m: &Move| Some(Change::Move(*m));

        if b1 <= a2 || b2 <= a1 {
            (keep(other), keep(self))
        } else if a1 <= a2 && b2 <= m1 {
            (keep(&other.shifted((b1 - m1) as isize)), keep(self))
        } else if m1 <= a2 && b2 <= b1 {
            (keep(&other.shifted(-((m1 - a1) as isize))), keep(self))
        } else if a2 <= a1 && b1 <= m2 {
            (keep(other), keep(&self.shifted((b2 - m2) as isize)))
        } else if m2 <= a1 && b1 <= b2 {
            (keep(other), keep(&self.shifted(-((m2 - a2) as isize))))
        } else {
            // Entangled windows: the argument wins and the receiver is rolled
            // back ahead of it.
            let set = ChangeSet::new([self.revert().into(), (*other).into()]);
            (Some(set.into()), None)
        }
    }
}
