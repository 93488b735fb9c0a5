// components/media_pipeline/src/lib.rs
//! Process orchestration for download, stream, play-while-downloading and
//! record runs: which external processes start, how their bytes are wired
//! together, and how they are torn down when the run is interrupted.
mod children;
mod error;
mod executor;
mod fanout;
mod player;
mod supervisor;

pub use children::{ChildProcessSet, Stage, StageHandle};
pub use error::{PipelineError, Result};
pub use executor::{Mode, OutcomeReport, PipelineExecutor, ResolvedPlan};
pub use fanout::{FanOut, FanOutReport};
pub use player::{player_for, ExternalPlayer, Mpv, Player};
pub use supervisor::{shutdown_signal, Supervisor};
