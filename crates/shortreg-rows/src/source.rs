use crate::{Row, RowSourceError};

/// A forward-only producer of rows.
///
/// `advance` either returns the next row, reports exhaustion with `Ok(None)`, or fails. Once it
/// has returned `Ok(None)` or an error it is never called again by [`Lookahead`], so
/// implementations don't need to be fused.
pub trait RowCursor {
    fn advance(&mut self) -> Result<Option<Row>, RowSourceError>;
}

/// The query-then-consume row protocol implemented by every reader.
///
/// - [`RowSource::has_next`] may do work (parse events, skip filtered rows) to find the next row,
///   but repeated calls without an intervening [`RowSource::next_row`] return the same answer and
///   never skip or duplicate a row.
/// - [`RowSource::next_row`] hands out the row found by the most recent affirmative `has_next`.
///   Calling it without one fails with [`RowSourceError::NoMoreRows`].
pub trait RowSource {
    fn has_next(&mut self) -> bool;

    fn next_row(&mut self) -> Result<Row, RowSourceError>;

    /// Adapt this source into a [`std::iter::Iterator`].
    fn rows(self) -> Rows<Self>
    where
        Self: Sized,
    {
        Rows { source: self }
    }
}

impl<S: RowSource + ?Sized> RowSource for &mut S {
    fn has_next(&mut self) -> bool {
        (**self).has_next()
    }

    fn next_row(&mut self) -> Result<Row, RowSourceError> {
        (**self).next_row()
    }
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn has_next(&mut self) -> bool {
        (**self).has_next()
    }

    fn next_row(&mut self) -> Result<Row, RowSourceError> {
        (**self).next_row()
    }
}

/// Single-row lookahead over a [`RowCursor`].
///
/// `has_next` pulls one row from the cursor and stashes it; `next_row` takes the stash. A cursor
/// error is stashed the same way so it is reported exactly once, in order, after which the
/// source is exhausted.
#[derive(Debug)]
pub struct Lookahead<C> {
    cursor: C,
    pending: Option<Row>,
    deferred: Option<RowSourceError>,
    finished: bool,
}

impl<C: RowCursor> Lookahead<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            pending: None,
            deferred: None,
            finished: false,
        }
    }

    pub fn cursor(&self) -> &C {
        &self.cursor
    }

    fn fill(&mut self) {
        // A stashed row or error must be consumed before the cursor moves again.
        if self.pending.is_some() || self.deferred.is_some() || self.finished {
            return;
        }
        match self.cursor.advance() {
            Ok(Some(row)) => self.pending = Some(row),
            Ok(None) => self.finished = true,
            Err(err) => {
                self.deferred = Some(err);
                self.finished = true;
            }
        }
    }
}

impl<C: RowCursor> RowSource for Lookahead<C> {
    fn has_next(&mut self) -> bool {
        self.fill();
        self.pending.is_some() || self.deferred.is_some()
    }

    fn next_row(&mut self) -> Result<Row, RowSourceError> {
        if let Some(row) = self.pending.take() {
            return Ok(row);
        }
        match self.deferred.take() {
            Some(err) => Err(err),
            None => Err(RowSourceError::NoMoreRows),
        }
    }
}

/// A source with no rows. Used when a document could not be opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct Empty;

impl RowSource for Empty {
    fn has_next(&mut self) -> bool {
        false
    }

    fn next_row(&mut self) -> Result<Row, RowSourceError> {
        Err(RowSourceError::NoMoreRows)
    }
}

/// Iterator adapter returned by [`RowSource::rows`].
#[derive(Debug)]
pub struct Rows<S> {
    source: S,
}

impl<S: RowSource> Iterator for Rows<S> {
    type Item = Result<Row, RowSourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.source.has_next() {
            return None;
        }
        Some(self.source.next_row())
    }
}
