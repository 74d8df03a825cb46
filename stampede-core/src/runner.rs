mod progress;
mod run;
pub mod schedule;
pub(crate) mod signal;
mod vu;

pub use progress::{LiveMetrics, ProgressFn, ProgressUpdate};
pub use run::{RunHandle, run, start, start_with_progress};
pub use schedule::{RampingSchedule, Stage, StageRamp, StageSnapshot};
