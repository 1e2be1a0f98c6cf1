//! # Fourline
//!
//! Session reconciliation for two-player four-in-a-row.
//!
//! Two clients share one session record through a gateway. Every write is
//! published on an update channel, and each client reconciles what it
//! receives against its own optimistic view. The rule engine plugs in
//! through the [`GameRules`](fourline_sync::GameRules) trait.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fourline::prelude::*;
//!
//! // Implement GameRules for your board, then:
//! // let channel = MemoryChannel::new();
//! // let store = MemoryStore::new(channel.clone());
//! // let client = FourlineClientBuilder::new()
//! //     .build::<MyRules, _, _>(store, channel);
//! // client.enter_username("alice")?;
//! // client.choose_mode(Mode::Multiplayer)?;
//! // let record = client.create_session().await?;
//! ```

mod client;
mod error;
pub mod telemetry;

pub use client::{FourlineClient, FourlineClientBuilder};
pub use error::FourlineError;

pub use fourline_channel;
pub use fourline_gateway;
pub use fourline_protocol;
pub use fourline_sync;

pub mod prelude {
    pub use crate::{FourlineClient, FourlineClientBuilder, FourlineError};
    pub use fourline_channel::{
        ChannelError, MemoryChannel, Publisher, SubscriptionHandle, UpdateChannel,
        UpdateStream, WebSocketChannel, WebSocketRelay,
    };
    pub use fourline_gateway::{
        Gateway, GatewayConfig, GatewayError, MemoryStore, SessionStore, StoreError,
    };
    pub use fourline_protocol::{
        GameType, Outcome, ParticipantId, RoomCode, Seat, SessionRecord, Username,
    };
    pub use fourline_sync::{
        FlowError, FlowState, GameRules, LocalSessionView, Mode, MoveError, Phase,
    };
}
