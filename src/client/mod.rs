//! Score submission client used by game modules.
//!
//! A game resolves the current player through an [`IdentityProvider`], posts its final score
//! with [`ScoreClient`], and refreshes its leaderboard view from the completion callback.

pub mod identity;
pub mod models;
pub mod submission;

pub use identity::{
    AuthenticatedIdentity, GuestIdentity, GuestStore, IdentityError, IdentityProvider,
    PlayerInfo, Session, SessionIdentity,
};
pub use models::ScoreRecord;
pub use submission::{ScoreClient, SubmitError};
