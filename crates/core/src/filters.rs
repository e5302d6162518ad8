//! Filter state and the two-phase stage/commit protocol.
//!
//! The pipeline only ever sees a committed [`FilterState`]. User edits land
//! in a staged copy and replace the committed value in a single assignment
//! on [`FilterSession::commit`].

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::MAX_LOOKBACK_DAYS;
use crate::error::{DashResult, DashboardError};
use crate::types::{Dimension, FunnelRecord};

/// Inclusive window of dates a user may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub earliest: NaiveDate,
    pub today: NaiveDate,
}

impl DateBounds {
    pub fn new(today: NaiveDate, lookback_days: i64) -> Self {
        Self {
            earliest: today - Duration::days(lookback_days.clamp(0, MAX_LOOKBACK_DAYS)),
            today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.earliest <= date && date <= self.today
    }

    pub fn check_range(&self, start: NaiveDate, end: NaiveDate) -> DashResult<()> {
        if start > end {
            return Err(DashboardError::InvalidFilter(format!(
                "start date {start} is after end date {end}"
            )));
        }
        if !self.contains(start) || !self.contains(end) {
            return Err(DashboardError::InvalidFilter(format!(
                "date range {start}..{end} is outside {}..{}",
                self.earliest, self.today
            )));
        }
        Ok(())
    }
}

/// The predicate selections the pipeline filters by. An empty selection
/// for a dimension places no restriction on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub selected_channels: BTreeSet<String>,
    #[serde(default)]
    pub selected_types: BTreeSet<String>,
    #[serde(default)]
    pub selected_states: BTreeSet<String>,
    #[serde(default)]
    pub selected_campaigns: BTreeSet<String>,
}

impl FilterState {
    /// Unrestricted state over `start..=end`.
    pub fn new(start: NaiveDate, end: NaiveDate, bounds: &DateBounds) -> DashResult<Self> {
        bounds.check_range(start, end)?;
        Ok(Self {
            start_date: start,
            end_date: end,
            selected_channels: BTreeSet::new(),
            selected_types: BTreeSet::new(),
            selected_states: BTreeSet::new(),
            selected_campaigns: BTreeSet::new(),
        })
    }

    /// Everything selected over the trailing `window_days`, clamped to the
    /// earliest selectable date.
    pub fn with_defaults(bounds: &DateBounds, window_days: i64) -> Self {
        let window = Duration::days(window_days.clamp(0, MAX_LOOKBACK_DAYS));
        let start = (bounds.today - window).max(bounds.earliest);
        Self {
            start_date: start,
            end_date: bounds.today,
            selected_channels: BTreeSet::new(),
            selected_types: BTreeSet::new(),
            selected_states: BTreeSet::new(),
            selected_campaigns: BTreeSet::new(),
        }
    }

    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.start_date, self.end_date)
    }

    pub fn selection(&self, dim: Dimension) -> &BTreeSet<String> {
        match dim {
            Dimension::Channel => &self.selected_channels,
            Dimension::Type => &self.selected_types,
            Dimension::State => &self.selected_states,
            Dimension::Campaign => &self.selected_campaigns,
        }
    }

    fn selection_mut(&mut self, dim: Dimension) -> &mut BTreeSet<String> {
        match dim {
            Dimension::Channel => &mut self.selected_channels,
            Dimension::Type => &mut self.selected_types,
            Dimension::State => &mut self.selected_states,
            Dimension::Campaign => &mut self.selected_campaigns,
        }
    }

    /// Date range and all four categorical predicates, combined.
    pub fn matches(&self, record: &FunnelRecord) -> bool {
        record.date >= self.start_date
            && record.date <= self.end_date
            && Dimension::ALL.iter().all(|&dim| {
                let selected = self.selection(dim);
                selected.is_empty() || selected.contains(record.dimension(dim))
            })
    }

    pub fn validate(&self, bounds: &DateBounds) -> DashResult<()> {
        bounds.check_range(self.start_date, self.end_date)
    }
}

/// One pending user edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterEdit {
    SetDateRange {
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Replace a dimension's selection. An empty set means all values.
    Select {
        dimension: Dimension,
        values: BTreeSet<String>,
    },
    /// Flip membership of one value. On an unrestricted dimension this
    /// narrows the selection to that single value.
    Toggle {
        dimension: Dimension,
        value: String,
    },
    Clear {
        dimension: Dimension,
    },
}

/// Committed filter state plus the interim edits not yet applied.
#[derive(Debug, Clone)]
pub struct FilterSession {
    bounds: DateBounds,
    committed: FilterState,
    staged: FilterState,
}

impl FilterSession {
    pub fn new(bounds: DateBounds, window_days: i64) -> Self {
        let initial = FilterState::with_defaults(&bounds, window_days);
        Self {
            bounds,
            committed: initial.clone(),
            staged: initial,
        }
    }

    pub fn bounds(&self) -> &DateBounds {
        &self.bounds
    }

    /// The state the pipeline runs against.
    pub fn committed(&self) -> &FilterState {
        &self.committed
    }

    pub fn staged(&self) -> &FilterState {
        &self.staged
    }

    pub fn has_pending(&self) -> bool {
        self.staged != self.committed
    }

    /// Apply an edit to the staged state only. An invalid date range is
    /// rejected and leaves the staged state untouched.
    pub fn stage(&mut self, edit: FilterEdit) -> DashResult<()> {
        match edit {
            FilterEdit::SetDateRange { start, end } => {
                self.bounds.check_range(start, end)?;
                self.staged.start_date = start;
                self.staged.end_date = end;
            }
            FilterEdit::Select { dimension, values } => {
                *self.staged.selection_mut(dimension) = values;
            }
            FilterEdit::Toggle { dimension, value } => {
                let selection = self.staged.selection_mut(dimension);
                if !selection.remove(&value) {
                    selection.insert(value);
                }
            }
            FilterEdit::Clear { dimension } => {
                self.staged.selection_mut(dimension).clear();
            }
        }
        Ok(())
    }

    /// Make the staged state effective. Returns whether anything changed.
    pub fn commit(&mut self) -> DashResult<bool> {
        self.staged.validate(&self.bounds)?;
        if !self.has_pending() {
            return Ok(false);
        }
        self.committed = self.staged.clone();
        Ok(true)
    }

    pub fn discard(&mut self) {
        self.staged = self.committed.clone();
    }
}
