//! Branches: a private log that exchanges changes with a shared one.

use crate::stream::Stream;
use weft_core::Result;

/// A pair of cursors, one into a shared `master` log and one into a private
/// `local` log forked from it.
///
/// Edits are appended on the local side. [`push`](Branch::push) publishes
/// them to master; [`pull`](Branch::pull) brings master's other changes in,
/// rebasing any unpushed local edits on top of them.
#[derive(Clone, Debug)]
pub struct Branch {
    master: Stream,
    local: Stream,
}

impl Branch {
    pub fn new(master: Stream) -> Self {
        Self {
            master,
            local: Stream::new(),
        }
    }

    /// Cursor into the shared log, just past the last change exchanged.
    pub fn master(&self) -> &Stream {
        &self.master
    }

    /// Cursor into the private log, just past the last change pushed.
    /// Append local edits here (or on any later node).
    pub fn local(&self) -> &Stream {
        &self.local
    }

    /// Append every local change not yet pushed to master. Returns the
    /// number of changes pushed.
    pub fn push(&mut self) -> Result<usize> {
        let mut pushed = 0;
        while let Some((change, next)) = self.local.next() {
            if let Some(change) = change {
                self.master = self.master.append(change)?;
                pushed += 1;
            }
            self.local = next;
        }
        tracing::debug!(pushed, "branch push");
        Ok(pushed)
    }

    /// Bring in master's changes, placing them before unpushed local edits.
    /// Returns the number of changes pulled.
    pub fn pull(&mut self) -> Result<usize> {
        let mut pulled = 0;
        while let Some((change, next)) = self.master.next() {
            if let Some(change) = change {
                self.local = self.local.reverse_append(change)?;
                pulled += 1;
            }
            self.master = next;
        }
        tracing::debug!(pulled, "branch pull");
        Ok(pulled)
    }

    /// Push then pull.
    pub fn merge(&mut self) -> Result<()> {
        self.push()?;
        self.pull()?;
        Ok(())
    }
}

impl Stream {
    /// Fork a private branch off this node.
    pub fn branch(&self) -> Branch {
        Branch::new(self.clone())
    }
}
