/*!
# Backlog Tracker

A study-backlog tracker: per subject it counts the lecture-units still to
watch, adds one for every day that passes without being the rest day, and
estimates how long the backlog takes to clear at a chosen daily pace.

## Overview

The arithmetic lives in a single value, [`Ledger`], holding the per-subject
records and one history point per day. Every operation takes "today" as an
argument and either succeeds completely or leaves the ledger untouched.
Persistence is a separate concern behind the [`RecordStore`] trait.

## Architecture

### Core
- **ledger**: accrual of missed days, completion credit, estimates
- **record**: `BacklogRecord`, `HistoryPoint`, derived `RecordState`
- **calendar**: rest day (Sunday) and the day-by-day range scan

### Persistence Layer
- **store**: `RecordStore` trait, flat-file `CsvStore`, `MemoryStore`
- **loader** / **downloader**: canonical CSV layout, JSON and XLSX export
- **saving**: gzip-compressed bincode snapshots

### Front end
- **app**: `Session` (store lifecycle, accrual at load) and the prompt loop
- **command**: prompt command parser
- **config**: TOML configuration with environment overrides

## Rules

- One unit accrues for each day in `(last_updated, today]` that is not Sunday.
- Accrual runs at most once per calendar day and never on Sunday.
- Completing `n` units removes `n` on Sunday and `n - 1` on other days, never
  going below zero.
- At pace `p` a week removes `7p - 6` units; the estimate for `l` lectures is
  `ceil(7l / (7p - 6))` days.

## Persisted layout

```text
backlog.csv   Subject,Number of Lectures,Last Updated
history.csv   Date,Total Backlog
```
Dates are written as `YYYY-MM-DD`.
*/

pub mod app;
pub mod calendar;
pub mod command;
pub mod config;
pub mod downloader;
pub mod error;
pub mod ledger;
pub mod loader;
pub mod record;
pub mod saving;
pub mod store;

pub use app::Session;
pub use calendar::{Clock, FixedClock, SystemClock, REST_DAY};
pub use config::Config;
pub use error::{LedgerError, LedgerResult, StoreError};
pub use ledger::{Accrual, Estimate, Ledger};
pub use record::{BacklogRecord, HistoryPoint, RecordState};
pub use store::{CsvStore, MemoryStore, RecordStore};
