// Domain models

mod query;
mod reading;
mod rollup;

pub use query::{HashrateBucket, RackPeriodStat, WorkerPeriodStat};
pub use reading::{Reading, WorkerStatus};
pub use rollup::{DailyRackStat, DailyWorkerStat};
