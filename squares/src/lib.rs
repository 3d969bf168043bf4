//! Squares pool domain library: digit axes, team alignment, score-to-cell mapping
//! and the payout trigger engine shared by the controller.

pub mod axis;
pub mod feed;
pub mod game;
pub mod grid;
pub mod manual;
pub mod payout;
pub mod teams;
pub mod types;
pub mod update;

pub use axis::{resolve_axis, Axis, AxisSet, QuarterlyAxes};
pub use feed::{EventState, FeedTeam, LiveEvent};
pub use game::GameDoc;
pub use manual::{plan_manual_payout, ManualPayoutError, ManualPlan};
pub use payout::{evaluate, Decision};
pub use teams::{align_event, match_teams, TeamAlignment};
pub use types::*;
pub use update::{apply_updates, Applied, ClaimError, GameUpdate, UpdateError};
