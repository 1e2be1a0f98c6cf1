//! `FourlineClient` builder and driver.
//!
//! This is the entry point for one participant. It ties the layers
//! together: user actions and gateway results become flow events, the
//! update channel feeds remote records through the reconciler, and the
//! resulting [`FlowState`] is published on a `watch` channel for the UI.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fourline_channel::{ChannelError, SubscriptionHandle, UpdateChannel};
use fourline_gateway::{Gateway, GatewayConfig, GatewayError, SessionStore};
use fourline_protocol::{GameType, ParticipantId, RoomCode, Seat, SessionRecord, Username};
use fourline_sync::{FlowEvent, FlowState, GameRules, Mode, Phase};
use tokio::sync::watch;

use crate::FourlineError;

/// State shared with subscription callbacks and background writes.
///
/// Holds no subscription handle, so callbacks capturing it can't keep the
/// client alive.
struct Core<S: SessionStore, G: GameRules> {
    gateway: Gateway<S>,
    identity: ParticipantId,
    state: watch::Sender<FlowState>,
    /// A held-back game type write is in flight.
    flushing: AtomicBool,
    _rules: PhantomData<fn() -> G>,
}

#[derive(Debug, Clone, Copy)]
enum WriteKind {
    GameType,
    Move,
}

impl<S: SessionStore, G: GameRules> Core<S, G> {
    fn dispatch(&self, event: FlowEvent) {
        self.state.send_modify(|state| {
            *state = std::mem::take(state).apply(event);
        });
    }

    fn fail(&self, error: FlowEvent) {
        self.dispatch(error);
        tracing::debug!(phase = %self.state.borrow().phase(), "flow failed");
    }

    /// Writes through the gateway and records the outcome in the flow.
    async fn write(
        &self,
        kind: WriteKind,
        record: SessionRecord,
    ) -> Result<SessionRecord, GatewayError> {
        let room_code = record.room_code.clone();
        let identity = self.identity.clone();
        let result = match kind {
            WriteKind::GameType => {
                self.gateway
                    .choose_game_type(&room_code, record, identity)
                    .await
            }
            WriteKind::Move => {
                self.gateway.submit_move(&room_code, record, identity).await
            }
        };
        match &result {
            Ok(stored) => self.dispatch(FlowEvent::WriteConfirmed(stored.clone())),
            Err(e) => {
                tracing::warn!(%room_code, ?kind, error = %e, "write rejected");
                self.fail(FlowEvent::WriteFailed(e.into()));
            }
        }
        result
    }

    /// Spawns the held-back game type write if a partner has shown up.
    fn flush_if_pending(core: &Arc<Self>) {
        if core.state.borrow().pending_game_type().is_none() {
            return;
        }
        if core.flushing.swap(true, Ordering::AcqRel) {
            return;
        }
        let core = Arc::clone(core);
        tokio::spawn(async move {
            // Re-read: the state may have moved on since the check above.
            let pending = core.state.borrow().pending_game_type();
            if let Some(mut record) = pending {
                record.version += 1;
                tracing::info!(
                    room_code = %record.room_code,
                    "partner joined, writing held game type"
                );
                let _ = core.write(WriteKind::GameType, record).await;
            }
            core.flushing.store(false, Ordering::Release);
        });
    }
}

/// Builder for configuring a [`FourlineClient`].
///
/// # Example
///
/// ```rust,ignore
/// use fourline::prelude::*;
///
/// let client = FourlineClientBuilder::new()
///     .max_create_attempts(10)
///     .build::<MyRules, _, _>(store, channel);
/// client.enter_username("alice")?;
/// ```
pub struct FourlineClientBuilder {
    config: GatewayConfig,
    identity: Option<ParticipantId>,
}

impl FourlineClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            identity: None,
        }
    }

    /// Sets the length of generated room codes.
    pub fn room_code_len(mut self, len: usize) -> Self {
        self.config.room_code_len = len;
        self
    }

    /// Sets how many fresh codes a create tries before giving up.
    pub fn max_create_attempts(mut self, attempts: u32) -> Self {
        self.config.max_create_attempts = attempts;
        self
    }

    /// Uses a fixed participant identity instead of a random one.
    pub fn identity(mut self, identity: ParticipantId) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Builds a client over the given store and update channel.
    pub fn build<G, S, C>(self, store: S, channel: C) -> FourlineClient<S, C, G>
    where
        G: GameRules,
        S: SessionStore,
        C: UpdateChannel,
    {
        let identity = self.identity.unwrap_or_else(ParticipantId::generate);
        tracing::debug!(%identity, "client created");
        let (state, _) = watch::channel(FlowState::default());
        FourlineClient {
            core: Arc::new(Core {
                gateway: Gateway::with_config(store, self.config),
                identity,
                state,
                flushing: AtomicBool::new(false),
                _rules: PhantomData,
            }),
            channel,
            subscription: Mutex::new(None),
        }
    }
}

impl Default for FourlineClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One participant's client.
///
/// Every action validates the current phase, talks to the gateway if it
/// needs to, and feeds the outcome back into the flow state. Observe the
/// state with [`watch`](Self::watch).
pub struct FourlineClient<S: SessionStore, C: UpdateChannel, G: GameRules> {
    core: Arc<Core<S, G>>,
    channel: C,
    subscription: Mutex<Option<SubscriptionHandle>>,
}

impl<S, C, G> FourlineClient<S, C, G>
where
    S: SessionStore,
    C: UpdateChannel,
    G: GameRules,
{
    /// Creates a new builder.
    pub fn builder() -> FourlineClientBuilder {
        FourlineClientBuilder::new()
    }

    // -----------------------------------------------------------------------
    // Observing
    // -----------------------------------------------------------------------

    /// This client's participant identity.
    pub fn identity(&self) -> &ParticipantId {
        &self.core.identity
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.core.state.borrow().phase()
    }

    /// A snapshot of the flow state.
    pub fn state(&self) -> FlowState {
        self.core.state.borrow().clone()
    }

    /// The record the user sees, if a session is held.
    pub fn session(&self) -> Option<SessionRecord> {
        self.core.state.borrow().effective()
    }

    /// A receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<FlowState> {
        self.core.state.subscribe()
    }

    // -----------------------------------------------------------------------
    // Before a session
    // -----------------------------------------------------------------------

    /// Sets the display name.
    pub fn enter_username(&self, raw: &str) -> Result<(), FourlineError> {
        let username = Username::parse(raw)?;
        self.core.dispatch(FlowEvent::UsernameEntered(username));
        Ok(())
    }

    pub fn choose_mode(&self, mode: Mode) -> Result<(), FourlineError> {
        self.expect_phase(&[Phase::ChoosingMode])?;
        self.core.dispatch(FlowEvent::ModeChosen(mode));
        Ok(())
    }

    /// Picks the game for single-player mode. Nothing is stored remotely.
    pub fn choose_single_player_game(
        &self,
        game_type: GameType,
    ) -> Result<(), FourlineError> {
        self.expect_phase(&[Phase::PickingSinglePlayerGame])?;
        self.core
            .dispatch(FlowEvent::SinglePlayerGameChosen(game_type));
        Ok(())
    }

    /// Creates a room under a fresh code and subscribes to it.
    pub async fn create_session(&self) -> Result<SessionRecord, FourlineError> {
        self.expect_phase(&[Phase::ChoosingCreateOrJoin])?;
        let username = self.username()?;
        self.core.dispatch(FlowEvent::CreateChosen);
        self.core.dispatch(FlowEvent::RequestStarted);

        let record = match self
            .core
            .gateway
            .create_with_fresh_code(username, self.core.identity.clone())
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.core.fail(FlowEvent::Failed((&e).into()));
                return Err(e.into());
            }
        };
        self.establish(record.clone(), Seat::Creator);
        self.subscribe(record.room_code.clone()).await?;
        Ok(record)
    }

    /// Switches to code entry.
    pub fn choose_join(&self) -> Result<(), FourlineError> {
        self.expect_phase(&[Phase::ChoosingCreateOrJoin])?;
        self.core.dispatch(FlowEvent::JoinChosen);
        Ok(())
    }

    /// Joins the room `raw` (case and surrounding whitespace ignored) and
    /// subscribes to it.
    pub async fn join_session(&self, raw: &str) -> Result<SessionRecord, FourlineError> {
        self.expect_phase(&[Phase::EnteringCode])?;
        let username = self.username()?;
        self.core.dispatch(FlowEvent::RequestStarted);

        let record = match self
            .core
            .gateway
            .join_session(raw, username, self.core.identity.clone())
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.core.fail(FlowEvent::Failed((&e).into()));
                return Err(e.into());
            }
        };
        self.establish(record.clone(), Seat::Joiner);
        self.subscribe(record.room_code.clone()).await?;
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // During a session
    // -----------------------------------------------------------------------

    /// Picks the game type. Creator only.
    ///
    /// With a partner present the choice is written right away. Otherwise
    /// it is held locally (phase `AwaitingPartner`) and written as soon as
    /// the partner's join arrives.
    pub async fn choose_game_type(&self, game_type: GameType) -> Result<(), FourlineError> {
        self.expect_phase(&[Phase::SessionEstablished])?;
        let (current, seat) = self.current()?;
        if seat != Seat::Creator {
            return Err(FourlineError::NotCreator);
        }

        let next = fourline_sync::choose_game_type::<G>(&current, game_type);
        self.core.dispatch(FlowEvent::LocalWrite(next.clone()));

        if current.participants.both_present() {
            self.core.write(WriteKind::GameType, next).await?;
        } else {
            tracing::info!(
                room_code = %current.room_code,
                %game_type,
                "game type held until a partner joins"
            );
            // The partner may have joined while we were deciding.
            Core::flush_if_pending(&self.core);
        }
        Ok(())
    }

    /// Plays `mv` for this client's seat and stores the result.
    pub async fn make_move(&self, mv: G::Move) -> Result<SessionRecord, FourlineError> {
        let phase = self.phase();
        if !phase.is_playable() {
            return Err(FourlineError::InvalidPhase(phase));
        }
        // The held game type hasn't been written yet.
        if self.core.state.borrow().pending_game_type().is_some() {
            return Err(FourlineError::InvalidPhase(Phase::AwaitingPartner));
        }
        let (current, seat) = self.current()?;
        let next = fourline_sync::play_move::<G>(&current, seat, mv)?;
        self.core.dispatch(FlowEvent::LocalWrite(next.clone()));
        Ok(self.core.write(WriteKind::Move, next).await?)
    }

    /// Clears the error. If a session is held, catches up on anything
    /// missed, subscribing again first if the stream has stopped.
    pub async fn retry(&self) -> Result<(), FourlineError> {
        self.core.dispatch(FlowEvent::Retry);
        let room_code = self
            .core
            .state
            .borrow()
            .view
            .as_ref()
            .map(|view| view.room_code.clone());
        let Some(room_code) = room_code else {
            return Ok(());
        };

        let live = self
            .lock_subscription()
            .as_ref()
            .is_some_and(|handle| handle.is_active() && handle.room_code() == &room_code);
        if live {
            self.catch_up(&room_code).await
        } else {
            self.subscribe(room_code).await
        }
    }

    /// Drops the subscription and returns to mode selection.
    pub fn leave(&self) {
        self.cancel_subscription();
        self.core.dispatch(FlowEvent::Reset);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn expect_phase(&self, allowed: &[Phase]) -> Result<(), FourlineError> {
        let phase = self.phase();
        if allowed.contains(&phase) {
            Ok(())
        } else {
            Err(FourlineError::InvalidPhase(phase))
        }
    }

    fn username(&self) -> Result<Username, FourlineError> {
        self.core
            .state
            .borrow()
            .username
            .clone()
            .ok_or(FourlineError::InvalidPhase(Phase::NoUsername))
    }

    fn current(&self) -> Result<(SessionRecord, Seat), FourlineError> {
        let state = self.core.state.borrow();
        match state.view.as_ref() {
            Some(view) => Ok((view.effective(), view.seat)),
            None => Err(FourlineError::InvalidPhase(state.phase())),
        }
    }

    fn establish(&self, record: SessionRecord, seat: Seat) {
        tracing::info!(
            room_code = %record.room_code,
            identity = %self.core.identity,
            %seat,
            "session established"
        );
        self.core.dispatch(FlowEvent::SessionEstablished {
            record,
            participant: self.core.identity.clone(),
            seat,
        });
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<SubscriptionHandle>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_subscription(&self) {
        let old = self.lock_subscription().take();
        if let Some(old) = old {
            old.cancel();
        }
    }

    /// Replaces the live subscription with one for `room_code`, then fetches
    /// once to pick up writes that landed before the stream opened.
    async fn subscribe(&self, room_code: RoomCode) -> Result<(), FourlineError> {
        self.cancel_subscription();

        let on_update = {
            let core = Arc::clone(&self.core);
            move |record: SessionRecord| {
                core.dispatch(FlowEvent::RemoteUpdate(record));
                Core::flush_if_pending(&core);
            }
        };
        let on_error = {
            let core = Arc::clone(&self.core);
            move |error: ChannelError| {
                core.fail(FlowEvent::Failed((&error).into()));
            }
        };

        let handle = match fourline_channel::subscribe(
            &self.channel,
            room_code.clone(),
            on_update,
            on_error,
        )
        .await
        {
            Ok(handle) => handle,
            Err(e) => {
                self.core.fail(FlowEvent::Failed((&e).into()));
                return Err(e.into());
            }
        };
        *self.lock_subscription() = Some(handle);

        self.catch_up(&room_code).await
    }

    /// Fetches the stored record once and feeds it in as a remote update.
    async fn catch_up(&self, room_code: &RoomCode) -> Result<(), FourlineError> {
        match self.core.gateway.fetch_session(room_code.as_str()).await {
            Ok(record) => {
                self.core.dispatch(FlowEvent::RemoteUpdate(record));
                Core::flush_if_pending(&self.core);
                Ok(())
            }
            Err(e) => {
                self.core.fail(FlowEvent::Failed((&e).into()));
                Err(e.into())
            }
        }
    }
}

impl<S: SessionStore, C: UpdateChannel, G: GameRules> Drop for FourlineClient<S, C, G> {
    fn drop(&mut self) {
        self.cancel_subscription();
    }
}
