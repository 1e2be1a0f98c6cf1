//! Client-side session synchronization for Fourline.
//!
//! Each client keeps its own projection of the shared session record and
//! reconciles it with what arrives over the update channel. Nothing in
//! this crate does I/O: every piece is a pure function or a value type, so
//! the whole flow can be tested without a runtime.
//!
//! # Key types
//!
//! - [`FlowState`] / [`FlowEvent`]: the client state and the reducer that
//!   advances it
//! - [`Phase`] / [`derive_phase`]: the lifecycle stage, derived on demand
//! - [`LocalSessionView`]: initial, local and remote snapshots, merged by
//!   [`LocalSessionView::effective`]
//! - [`reconcile`]: the room-check and echo-suppression rules for incoming
//!   updates
//! - [`GameRules`]: the rule engine hook, plus [`play_move`] and
//!   [`choose_game_type`] which wrap it with turn bookkeeping

mod error;
mod flow;
mod lifecycle;
mod reconciler;
mod rules;
mod view;

pub use error::{FlowError, MoveError};
pub use flow::{FlowEvent, FlowState};
pub use lifecycle::{CreatedCode, LifecycleInputs, Mode, Phase, derive_phase};
pub use reconciler::{DropReason, Reconciled, reconcile};
pub use rules::{GameRules, choose_game_type, play_move};
pub use view::LocalSessionView;
