//! Scrollable result cursors.
//!
//! A cursor wraps a live [`ResultFeed`] and tracks a logical position: 0 is
//! before-first, `row_count + 1` is after-last, and `1..=row_count` are the
//! rows. Every positioning call reports whether a row now exists at the new
//! position; on success the row reader materializes the row value, on
//! failure the materialized value is cleared.
//!
//! [`EmptyCursor`] is the safe placeholder for queries that never executed
//! (an empty list-parameter short-circuit); [`SessionCursor`] dispatches
//! between the live and empty variants behind one type.

use crate::reader::RowReader;
use crate::Session;
use quarry_core::feed::ResultFeed;
use quarry_core::{Error, Result};
use std::marker::PhantomData;

/// Position bookkeeping for one cursor.
///
/// Owned exclusively by the cursor; positions clamp to the before-first and
/// after-last sentinels, and reported row numbers are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    row_count: usize,
    position: usize,
}

impl CursorState {
    /// Start before the first row of a feed with `row_count` rows.
    pub const fn new(row_count: usize) -> Self {
        Self {
            row_count,
            position: 0,
        }
    }

    /// Number of rows in the underlying feed.
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    /// Current logical position (0 = before-first, count+1 = after-last).
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Is the position on an actual row?
    pub const fn is_on_row(&self) -> bool {
        self.position >= 1 && self.position <= self.row_count
    }

    /// Is the position at the before-first sentinel?
    pub const fn is_before_first(&self) -> bool {
        self.position == 0
    }

    /// Is the position at the after-last sentinel?
    pub const fn is_after_last(&self) -> bool {
        self.position == self.row_count + 1
    }

    /// Zero-based row number, -1 when not on a row.
    pub const fn row_number(&self) -> i64 {
        if self.is_on_row() {
            self.position as i64 - 1
        } else {
            -1
        }
    }

    /// Target of a relative move, clamped to the sentinels.
    pub fn relative_target(&self, offset: i64) -> usize {
        let limit = self.row_count as i64 + 1;
        (self.position as i64 + offset).clamp(0, limit) as usize
    }

    /// Target of an absolute 1-based move; negative counts from the end
    /// (-1 is the last row). Clamped to the sentinels.
    pub fn absolute_target(&self, position: i64) -> usize {
        let limit = self.row_count as i64 + 1;
        let target = if position >= 0 {
            position
        } else {
            self.row_count as i64 + position + 1
        };
        target.clamp(0, limit) as usize
    }

    /// Move to a computed target.
    pub fn apply(&mut self, target: usize) {
        self.position = target;
    }
}

/// A positionable cursor over query results.
///
/// Positioning methods return whether a row exists at the new position.
/// `get` fails once the cursor is closed; positioning a closed cursor is a
/// no-op returning false.
pub trait ScrollableCursor {
    /// The materialized row type.
    type Item;

    /// Advance one row.
    fn next(&mut self) -> Result<bool>;

    /// Retreat one row.
    fn previous(&mut self) -> Result<bool>;

    /// Move a relative number of rows, forward or backward.
    fn scroll(&mut self, offset: i64) -> Result<bool>;

    /// Move to an absolute 1-based position; negative counts from the end.
    fn position(&mut self, position: i64) -> Result<bool>;

    /// Move to the first row.
    fn first(&mut self) -> Result<bool>;

    /// Move to the last row.
    fn last(&mut self) -> Result<bool>;

    /// Move to just before the first row.
    fn before_first(&mut self) -> Result<()>;

    /// Move to just after the last row.
    fn after_last(&mut self) -> Result<()>;

    /// Is the cursor on the first row?
    fn is_first(&self) -> bool;

    /// Is the cursor on the last row?
    fn is_last(&self) -> bool;

    /// Zero-based number of the current row, -1 when not on a row.
    fn row_number(&self) -> i64;

    /// Move to a zero-based row number; negative counts from the end.
    fn set_row_number(&mut self, number: i64) -> Result<bool>;

    /// The materialized row at the current position.
    ///
    /// `None` while on a sentinel; an error once the cursor is closed.
    fn get(&self) -> Result<Option<&Self::Item>>;

    /// Release the cursor's resources. Idempotent.
    fn close(&mut self);

    /// Has the cursor been closed?
    fn is_closed(&self) -> bool;
}

/// A live cursor over an executed query.
///
/// Holds a mutable borrow of its session for its whole life, so no other
/// session operation can interleave with an open cursor. Dropping an
/// unclosed cursor closes it.
pub struct ScrollCursor<'s, R: RowReader> {
    session: &'s mut Session,
    feed: Box<dyn ResultFeed>,
    reader: R,
    state: CursorState,
    current: Option<R::Output>,
    closed: bool,
}

impl<'s, R: RowReader> ScrollCursor<'s, R> {
    pub(crate) fn new(session: &'s mut Session, feed: Box<dyn ResultFeed>, reader: R) -> Self {
        let state = CursorState::new(feed.row_count());
        Self {
            session,
            feed,
            reader,
            state,
            current: None,
            closed: false,
        }
    }

    /// Position snapshot, mostly for tests and diagnostics.
    pub const fn state(&self) -> &CursorState {
        &self.state
    }

    fn move_to(&mut self, target: usize) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        self.state.apply(target);
        self.current = None;

        let occupied = self
            .feed
            .occupy(target)
            .map_err(|err| Error::data("could not position result feed", err))?;
        if !occupied {
            return Ok(false);
        }

        let Some(row) = self.feed.current().cloned() else {
            return Ok(false);
        };
        let value = self.reader.read(&row, self.session.context_mut())?;
        self.current = Some(value);
        tracing::trace!(row = self.state.row_number(), "materialized cursor row");
        Ok(true)
    }
}

impl<R: RowReader> ScrollableCursor for ScrollCursor<'_, R> {
    type Item = R::Output;

    fn next(&mut self) -> Result<bool> {
        let target = self.state.relative_target(1);
        self.move_to(target)
    }

    fn previous(&mut self) -> Result<bool> {
        let target = self.state.relative_target(-1);
        self.move_to(target)
    }

    fn scroll(&mut self, offset: i64) -> Result<bool> {
        let target = self.state.relative_target(offset);
        self.move_to(target)
    }

    fn position(&mut self, position: i64) -> Result<bool> {
        let target = self.state.absolute_target(position);
        self.move_to(target)
    }

    fn first(&mut self) -> Result<bool> {
        self.position(1)
    }

    fn last(&mut self) -> Result<bool> {
        self.position(-1)
    }

    fn before_first(&mut self) -> Result<()> {
        self.move_to(0)?;
        Ok(())
    }

    fn after_last(&mut self) -> Result<()> {
        let target = self.state.row_count() + 1;
        self.move_to(target)?;
        Ok(())
    }

    fn is_first(&self) -> bool {
        !self.closed && self.state.position() == 1 && self.state.is_on_row()
    }

    fn is_last(&self) -> bool {
        !self.closed && self.state.is_on_row() && self.state.position() == self.state.row_count()
    }

    fn row_number(&self) -> i64 {
        if self.closed {
            -1
        } else {
            self.state.row_number()
        }
    }

    fn set_row_number(&mut self, number: i64) -> Result<bool> {
        if number >= 0 {
            self.position(number + 1)
        } else {
            self.position(number)
        }
    }

    fn get(&self) -> Result<Option<&Self::Item>> {
        if self.closed {
            return Err(Error::cursor_closed());
        }
        Ok(self.current.as_ref())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.current = None;
        if let Err(err) = self.feed.release() {
            tracing::warn!(error = %err, "result feed release failed during cursor close");
        }
        self.session.statement_finished();
        tracing::debug!("cursor closed");
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<R: RowReader> Drop for ScrollCursor<'_, R> {
    fn drop(&mut self) {
        self.close();
    }
}

/// The placeholder cursor for queries that never executed.
///
/// Always closed; every positioning call is a no-op returning false, and
/// `get` answers an absent row rather than the closed-cursor error.
#[derive(Debug, Default)]
pub struct EmptyCursor<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> EmptyCursor<T> {
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> ScrollableCursor for EmptyCursor<T> {
    type Item = T;

    fn next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn previous(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn scroll(&mut self, _offset: i64) -> Result<bool> {
        Ok(false)
    }

    fn position(&mut self, _position: i64) -> Result<bool> {
        Ok(false)
    }

    fn first(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn last(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn before_first(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_last(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_first(&self) -> bool {
        false
    }

    fn is_last(&self) -> bool {
        false
    }

    fn row_number(&self) -> i64 {
        -1
    }

    fn set_row_number(&mut self, _number: i64) -> Result<bool> {
        Ok(false)
    }

    fn get(&self) -> Result<Option<&Self::Item>> {
        Ok(None)
    }

    fn close(&mut self) {}

    fn is_closed(&self) -> bool {
        true
    }
}

/// The cursor type `Session::scroll` hands out: live or empty.
pub enum SessionCursor<'s, R: RowReader> {
    /// A cursor over an executed query.
    Live(ScrollCursor<'s, R>),
    /// The no-query placeholder.
    Empty(EmptyCursor<R::Output>),
}

impl<R: RowReader> std::fmt::Debug for SessionCursor<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live(_) => f.write_str("SessionCursor::Live"),
            Self::Empty(_) => f.write_str("SessionCursor::Empty"),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $cursor:ident => $body:expr) => {
        match $self {
            SessionCursor::Live($cursor) => $body,
            SessionCursor::Empty($cursor) => $body,
        }
    };
}

impl<R: RowReader> ScrollableCursor for SessionCursor<'_, R> {
    type Item = R::Output;

    fn next(&mut self) -> Result<bool> {
        dispatch!(self, c => c.next())
    }

    fn previous(&mut self) -> Result<bool> {
        dispatch!(self, c => c.previous())
    }

    fn scroll(&mut self, offset: i64) -> Result<bool> {
        dispatch!(self, c => c.scroll(offset))
    }

    fn position(&mut self, position: i64) -> Result<bool> {
        dispatch!(self, c => c.position(position))
    }

    fn first(&mut self) -> Result<bool> {
        dispatch!(self, c => c.first())
    }

    fn last(&mut self) -> Result<bool> {
        dispatch!(self, c => c.last())
    }

    fn before_first(&mut self) -> Result<()> {
        dispatch!(self, c => c.before_first())
    }

    fn after_last(&mut self) -> Result<()> {
        dispatch!(self, c => c.after_last())
    }

    fn is_first(&self) -> bool {
        dispatch!(self, c => c.is_first())
    }

    fn is_last(&self) -> bool {
        dispatch!(self, c => c.is_last())
    }

    fn row_number(&self) -> i64 {
        dispatch!(self, c => c.row_number())
    }

    fn set_row_number(&mut self, number: i64) -> Result<bool> {
        dispatch!(self, c => c.set_row_number(number))
    }

    fn get(&self) -> Result<Option<&Self::Item>> {
        dispatch!(self, c => c.get())
    }

    fn close(&mut self) {
        dispatch!(self, c => c.close());
    }

    fn is_closed(&self) -> bool {
        dispatch!(self, c => c.is_closed())
    }
}
