//! The displayed dataset and the ordering of the responses that replace it.
//!
//! Every search takes a [`Ticket`]. Responses may resolve in any order; only a
//! response whose ticket is newer than the one on screen replaces the grid.

use std::time::Duration;

use crate::grid::Grid;
use crate::normalize::DisplayRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A newer search already reached the screen
    Stale,
}

#[derive(Debug, Default)]
pub struct Session {
    grid: Grid,
    issued: u64,
    displayed: u64,
    in_flight: usize,
    response_time: Option<Duration>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        self.in_flight += 1;
        Ticket(self.issued)
    }

    pub fn apply(
        &mut self,
        ticket: Ticket,
        records: Vec<DisplayRecord>,
        elapsed: Duration,
    ) -> Outcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        if ticket.0 <= self.displayed {
            tracing::debug!(
                ticket = ticket.0,
                displayed = self.displayed,
                "discarding stale response"
            );
            return Outcome::Stale;
        }
        self.displayed = ticket.0;
        self.response_time = Some(elapsed);
        self.grid.replace(records);
        Outcome::Applied
    }

    /// Close out a ticket whose request failed. The dataset is left untouched.
    pub fn fail(&mut self, _ticket: Ticket) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight > 0
    }

    pub fn response_time(&self) -> Option<Duration> {
        self.response_time
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}
