//! The gateway: every read and write a client makes against the store.
//!
//! The gateway does no game-rule checking. It only guards the parts of a
//! record that must never change once set:
//!
//! - the room code and both participant slots,
//! - the game type,
//! - the outcome of a finished game,
//!
//! and rejects writes built on a version other than the one stored.

use std::sync::Arc;

use fourline_protocol::{ParticipantId, RoomCode, SessionRecord, Username};

use crate::{GatewayConfig, GatewayError, SessionStore, StoreError};

type CodeGenerator = Arc<dyn Fn() -> RoomCode + Send + Sync>;

/// Client-side access to the session store.
///
/// ```rust
/// # async fn example() -> Result<(), fourline_gateway::GatewayError> {
/// use fourline_channel::NullPublisher;
/// use fourline_gateway::{Gateway, MemoryStore};
/// use fourline_protocol::{ParticipantId, Username};
///
/// let gateway = Gateway::new(MemoryStore::new(NullPublisher));
/// let created = gateway
///     .create_with_fresh_code(
///         Username::parse("alice").unwrap(),
///         ParticipantId::new("userA"),
///     )
///     .await?;
///
/// let joined = gateway
///     .join_session(
///         &created.room_code.as_str().to_lowercase(),
///         Username::parse("bob").unwrap(),
///         ParticipantId::new("userB"),
///     )
///     .await?;
/// assert!(joined.participants.both_present());
/// # Ok(())
/// # }
/// ```
pub struct Gateway<S: SessionStore> {
    store: S,
    config: GatewayConfig,
    generate_code: CodeGenerator,
}

impl<S: SessionStore> Gateway<S> {
    /// Creates a gateway with the default config.
    pub fn new(store: S) -> Self {
        Self::with_config(store, GatewayConfig::default())
    }

    pub fn with_config(store: S, config: GatewayConfig) -> Self {
        let len = config.room_code_len;
        Self {
            store,
            config,
            generate_code: Arc::new(move || RoomCode::generate(len)),
        }
    }

    /// Replaces the random room code generator. Used by tests to force
    /// collisions.
    pub fn with_code_generator(
        mut self,
        generate: impl Fn() -> RoomCode + Send + Sync + 'static,
    ) -> Self {
        self.generate_code = Arc::new(generate);
        self
    }

    // -----------------------------------------------------------------------
    // Create / fetch / join
    // -----------------------------------------------------------------------

    /// Creates the record for a new room with `creator` in the first slot.
    ///
    /// # Errors
    /// [`GatewayError::CreateCollision`] if `room_code` is taken.
    pub async fn create_session(
        &self,
        room_code: RoomCode,
        creator: Username,
        participant: ParticipantId,
    ) -> Result<SessionRecord, GatewayError> {
        let record = SessionRecord::new(room_code, creator, participant);
        match self.store.create(record).await {
            Ok(created) => {
                tracing::info!(
                    room_code = %created.room_code,
                    creator = ?created.participants.creator,
                    "session created"
                );
                Ok(created)
            }
            Err(StoreError::AlreadyExists(code)) => {
                Err(GatewayError::CreateCollision(code))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Creates a room under a freshly generated code, drawing a new code
    /// after each collision up to `max_create_attempts` times.
    ///
    /// # Errors
    /// [`GatewayError::CreateCollision`] once every attempt collided; any
    /// other failure is returned immediately.
    pub async fn create_with_fresh_code(
        &self,
        creator: Username,
        participant: ParticipantId,
    ) -> Result<SessionRecord, GatewayError> {
        let attempts = self.config.max_create_attempts.max(1);
        let mut attempt = 1;
        loop {
            let code = (self.generate_code)();
            match self
                .create_session(code, creator.clone(), participant.clone())
                .await
            {
                Err(GatewayError::CreateCollision(code)) if attempt < attempts => {
                    tracing::warn!(%code, attempt, "room code collision, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Looks up a session. `raw` is trimmed and uppercased first.
    ///
    /// # Errors
    /// [`GatewayError::NotFound`] if the code is malformed or unknown.
    pub async fn fetch_session(
        &self,
        raw: &str,
    ) -> Result<SessionRecord, GatewayError> {
        let code = RoomCode::parse(raw)
            .map_err(|_| GatewayError::NotFound(raw.trim().to_string()))?;
        self.fetch(&code).await
    }

    /// Puts `joiner` in the second slot of an existing session.
    ///
    /// # Errors
    /// - [`GatewayError::NotFound`] if there is no such session
    /// - [`GatewayError::AlreadyFull`] if someone already joined
    pub async fn join_session(
        &self,
        raw: &str,
        joiner: Username,
        participant: ParticipantId,
    ) -> Result<SessionRecord, GatewayError> {
        let mut record = self.fetch_session(raw).await?;
        if record.participants.joiner.is_some() {
            return Err(GatewayError::AlreadyFull(record.room_code));
        }

        let base = record.version;
        record.participants.joiner = Some(joiner);
        record.last_updated_by = Some(participant);
        let joined = match self.store.update(record, base).await {
            Ok(joined) => joined,
            Err(StoreError::VersionMismatch { room_code, .. }) => {
                // Someone wrote between our read and our write. If that was
                // another joiner, the slot is gone.
                let current = self.fetch(&room_code).await?;
                return Err(if current.participants.joiner.is_some() {
                    tracing::warn!(%room_code, "lost a join race");
                    GatewayError::AlreadyFull(room_code)
                } else {
                    GatewayError::Conflict(format!(
                        "session changed while joining (now version {})",
                        current.version
                    ))
                });
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            room_code = %joined.room_code,
            joiner = ?joined.participants.joiner,
            "session joined"
        );
        Ok(joined)
    }

    // -----------------------------------------------------------------------
    // Writes during play
    // -----------------------------------------------------------------------

    /// Stores the creator's game type choice together with the initial
    /// board.
    ///
    /// # Errors
    /// [`GatewayError::Conflict`] if a game type is already stored, nobody
    /// has joined yet, `updated` carries no game type, or the write fails
    /// the checks of [`submit_move`](Self::submit_move).
    pub async fn choose_game_type(
        &self,
        room_code: &RoomCode,
        updated: SessionRecord,
        participant: ParticipantId,
    ) -> Result<SessionRecord, GatewayError> {
        let stored = self.fetch(room_code).await?;
        if let Some(existing) = stored.game_type {
            return Err(GatewayError::Conflict(format!(
                "game type already chosen ({existing})"
            )));
        }
        if stored.participants.joiner.is_none() {
            return Err(GatewayError::Conflict(
                "cannot choose a game type before a partner joins".into(),
            ));
        }
        let Some(game_type) = updated.game_type else {
            return Err(GatewayError::Conflict("no game type in update".into()));
        };

        let written = self.write(&stored, updated, participant).await?;
        tracing::info!(%room_code, %game_type, "game type chosen");
        Ok(written)
    }

    /// Persists the record after a move. The move itself is not checked;
    /// that is the rule engine's job on the client.
    ///
    /// # Errors
    /// - [`GatewayError::NotFound`] if there is no such session
    /// - [`GatewayError::Conflict`] if the stored game is over, an
    ///   immutable field differs, or `updated.version` isn't exactly one
    ///   past the stored version
    pub async fn submit_move(
        &self,
        room_code: &RoomCode,
        updated: SessionRecord,
        participant: ParticipantId,
    ) -> Result<SessionRecord, GatewayError> {
        let stored = self.fetch(room_code).await?;
        let written = self.write(&stored, updated, participant).await?;
        tracing::debug!(
            %room_code,
            version = written.version,
            move_count = written.move_count,
            "move stored"
        );
        Ok(written)
    }

    async fn fetch(
        &self,
        room_code: &RoomCode,
    ) -> Result<SessionRecord, GatewayError> {
        self.store
            .get(room_code)
            .await?
            .ok_or_else(|| GatewayError::NotFound(room_code.to_string()))
    }

    /// Checks `updated` against `stored`, stamps it, and overwrites.
    ///
    /// The store only accepts the write while it still holds `stored`'s
    /// version, so of two writers racing on the same base exactly one wins.
    async fn write(
        &self,
        stored: &SessionRecord,
        mut updated: SessionRecord,
        participant: ParticipantId,
    ) -> Result<SessionRecord, GatewayError> {
        check_update(stored, &updated)?;
        updated.last_updated_by = Some(participant);
        self.store
            .update(updated, stored.version)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(code) => GatewayError::NotFound(code.to_string()),
                StoreError::VersionMismatch {
                    expected, actual, ..
                } => GatewayError::Conflict(format!(
                    "stale write: based on version {expected}, stored version is {actual}"
                )),
                other => other.into(),
            })
    }
}

fn check_update(
    stored: &SessionRecord,
    updated: &SessionRecord,
) -> Result<(), GatewayError> {
    if updated.room_code != stored.room_code {
        return Err(GatewayError::Conflict(format!(
            "room code changed from {} to {}",
            stored.room_code, updated.room_code
        )));
    }
    if stored.is_terminal() {
        return Err(GatewayError::Conflict("game is already over".into()));
    }
    if updated.participants != stored.participants {
        return Err(GatewayError::Conflict("participants changed".into()));
    }
    if stored.game_type.is_some() && updated.game_type != stored.game_type {
        return Err(GatewayError::Conflict("game type changed".into()));
    }
    if updated.version != stored.version + 1 {
        return Err(GatewayError::Conflict(format!(
            "stale write: based on version {}, stored version is {}",
            updated.version.saturating_sub(1),
            stored.version
        )));
    }
    Ok(())
}
