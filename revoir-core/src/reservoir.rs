//! Weighted-reservoir sampling over light-transport samples.
//!
//! A reservoir is the sufficient statistic of every candidate it has seen:
//! the surviving sample, the effective candidate count `M` and the running
//! weight sum. Streaming a candidate keeps it resident with probability
//! `w / Σw`, which - after [`finalize`](DiReservoir::finalize) rescales the
//! weight sum - makes the single survivor an estimator of the full target
//! distribution.

mod di;
mod gi;
mod mis;

pub use self::di::*;
pub use self::gi::*;
pub use self::mis::*;
