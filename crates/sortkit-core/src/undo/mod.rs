#![forbid(unsafe_code)]

//! Snapshot history shared by the partition and the metadata store.
//!
//! Both curation structures keep every version they ever committed so that
//! an undo is a cursor move rather than a reverse computation:
//!
//! ```text
//! commit(p1)  commit(p2)  undo()
//! ┌────────────────────────────────────────────┐
//! │ Past:    [Arc(p0), Arc(p1)]                │
//! │ Future:  [Arc(p2)]                         │
//! │ Current: Arc(p1)                           │
//! └────────────────────────────────────────────┘
//! ```
//!
//! Snapshots use persistent collections from [`im`], so consecutive versions
//! share almost all of their memory.

pub mod snapshot_history;

pub use snapshot_history::SnapshotHistory;
