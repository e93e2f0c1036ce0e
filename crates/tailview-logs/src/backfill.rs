use chrono::NaiveDate;
use tracing::debug;

use tailview_types::BackfillState;

/// Which request a ticket belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchKind {
    /// First page after a date change or reset
    Initial,
    /// An older page requested by scrolling
    Backfill,
}

/// Identifies one outstanding historical fetch
///
/// A completion is only applied if its ticket is still the one in flight;
/// anything else is a response for an abandoned context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    /// Controller context generation the request was issued under
    pub epoch: u64,
    pub date: NaiveDate,
    pub offset: usize,
    pub limit: usize,
    pub kind: FetchKind,
}

/// Cursor-based, single-flight paging of older entries
#[derive(Debug)]
pub struct BackfillPaginator {
    page_size: usize,

    /// Number of records received for the current date
    cursor: usize,

    /// False once a short page has been seen
    has_more: bool,

    /// The single outstanding request, if any
    in_flight: Option<FetchTicket>,

    /// Whether the last request failed
    failed: bool,
}

impl BackfillPaginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            cursor: 0,
            has_more: true,
            in_flight: None,
            failed: false,
        }
    }

    /// Forget everything about the previous date
    ///
    /// Any request still in flight becomes stale.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.has_more = true;
        self.in_flight = None;
        self.failed = false;
    }

    /// Stop paging: the backend has nothing more for this date
    pub fn mark_exhausted(&mut self) {
        self.has_more = false;
    }

    /// Issue the next request, unless one is pending or data ran out
    pub fn next_page(&mut self, epoch: u64, date: NaiveDate, kind: FetchKind) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            debug!(?kind, "fetch already in flight, ignoring trigger");
            return None;
        }
        if !self.has_more {
            debug!(?kind, "no more logs for this date, ignoring trigger");
            return None;
        }

        let ticket = FetchTicket {
            epoch,
            date,
            offset: self.cursor,
            limit: self.page_size,
            kind,
        };
        self.in_flight = Some(ticket.clone());
        Some(ticket)
    }

    /// Whether `ticket` is the request currently in flight
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.in_flight.as_ref() == Some(ticket)
    }

    /// Record a successful response of `received` records
    ///
    /// Returns false (and changes nothing) for a stale ticket.
    pub fn complete(&mut self, ticket: &FetchTicket, received: usize) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        self.failed = false;
        self.cursor += received;
        if received < ticket.limit {
            debug!(offset = ticket.offset, received, "short page, logs exhausted");
            self.has_more = false;
        }
        true
    }

    /// Release the single-flight guard after a failure, keeping `has_more`
    pub fn fail(&mut self, ticket: &FetchTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        self.failed = true;
        true
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn state(&self) -> BackfillState {
        if self.in_flight.is_some() {
            BackfillState::Loading
        } else if self.failed {
            BackfillState::Failed
        } else if !self.has_more {
            BackfillState::Exhausted
        } else {
            BackfillState::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_single_flight() {
        let mut pager = BackfillPaginator::new(50);
        assert!(pager.next_page(1, date(), FetchKind::Backfill).is_some());
        assert!(pager.next_page(1, date(), FetchKind::Backfill).is_none());
        assert_eq!(pager.state(), BackfillState::Loading);
    }

    #[test]
    fn test_cursor_advances_by_received() {
        let mut pager = BackfillPaginator::new(2);
        let first = pager.next_page(1, date(), FetchKind::Initial).unwrap();
        assert_eq!(first.offset, 0);
        assert!(pager.complete(&first, 2));

        let second = pager.next_page(1, date(), FetchKind::Backfill).unwrap();
        assert_eq!(second.offset, 2);
        assert_eq!(second.limit, 2);
    }

    #[test]
    fn test_short_page_exhausts() {
        let mut pager = BackfillPaginator::new(10);
        let ticket = pager.next_page(1, date(), FetchKind::Backfill).unwrap();
        pager.complete(&ticket, 3);

        assert!(!pager.has_more());
        assert_eq!(pager.state(), BackfillState::Exhausted);
        assert!(pager.next_page(1, date(), FetchKind::Backfill).is_none());
    }

    #[test]
    fn test_failure_releases_guard_and_keeps_has_more() {
        let mut pager = BackfillPaginator::new(10);
        let ticket = pager.next_page(1, date(), FetchKind::Backfill).unwrap();
        assert!(pager.fail(&ticket));

        assert!(pager.has_more());
        assert_eq!(pager.state(), BackfillState::Failed);
        let retry = pager.next_page(1, date(), FetchKind::Backfill).unwrap();
        assert_eq!(retry.offset, 0);
    }

    #[test]
    fn test_reset_makes_in_flight_ticket_stale() {
        let mut pager = BackfillPaginator::new(10);
        let ticket = pager.next_page(1, date(), FetchKind::Backfill).unwrap();
        pager.reset();

        assert!(!pager.complete(&ticket, 10));
        assert_eq!(pager.cursor(), 0);
        assert_eq!(pager.state(), BackfillState::Idle);
    }
}
