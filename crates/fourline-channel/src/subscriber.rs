//! Turns an [`UpdateChannel`] into callbacks for one room.
//!
//! [`subscribe`] opens the stream, then forwards every record whose room code
//! matches to `on_update`. The first channel failure goes to `on_error` and
//! ends the subscription; there is no automatic reconnect. Callers recover
//! by subscribing again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fourline_protocol::{RoomCode, SessionRecord};
use tokio::task::JoinHandle;

use crate::{ChannelError, UpdateChannel, UpdateStream};

type OnUpdate = Box<dyn FnMut(SessionRecord) + Send>;
type OnError = Box<dyn FnMut(ChannelError) + Send>;

struct Callbacks {
    on_update: OnUpdate,
    on_error: OnError,
}

type SharedCallbacks = Arc<Mutex<Option<Callbacks>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Subscribes to updates of `room_code`.
///
/// The stream is open by the time this returns, so any update published
/// afterwards reaches `on_update`. Records for other rooms are dropped.
///
/// # Errors
///
/// Returns whatever the channel reports when opening the stream fails.
pub async fn subscribe<C, U, E>(
    channel: &C,
    room_code: RoomCode,
    on_update: U,
    on_error: E,
) -> Result<SubscriptionHandle, ChannelError>
where
    C: UpdateChannel,
    U: FnMut(SessionRecord) + Send + 'static,
    E: FnMut(ChannelError) + Send + 'static,
{
    let stream = channel.open(&room_code).await?;
    let callbacks: SharedCallbacks = Arc::new(Mutex::new(Some(Callbacks {
        on_update: Box::new(on_update),
        on_error: Box::new(on_error),
    })));

    let task = tokio::spawn(forward(
        stream,
        room_code.clone(),
        Arc::clone(&callbacks),
    ));
    tracing::info!(%room_code, "subscribed to session updates");

    Ok(SubscriptionHandle {
        room_code,
        callbacks,
        task: Mutex::new(Some(task)),
    })
}

async fn forward<S: UpdateStream>(
    mut stream: S,
    room_code: RoomCode,
    callbacks: SharedCallbacks,
) {
    loop {
        match stream.recv().await {
            Ok(Some(record)) => {
                if record.room_code != room_code {
                    tracing::warn!(
                        %room_code,
                        received = %record.room_code,
                        "dropping update for another room"
                    );
                    continue;
                }
                if !deliver_update(&callbacks, record) {
                    return;
                }
            }
            Ok(None) => {
                deliver_error(&callbacks, ChannelError::Closed);
                return;
            }
            Err(e) => {
                deliver_error(&callbacks, e);
                return;
            }
        }
    }
}

/// Returns `false` once the subscription has been cancelled.
fn deliver_update(callbacks: &SharedCallbacks, record: SessionRecord) -> bool {
    match lock(callbacks).as_mut() {
        Some(cbs) => {
            (cbs.on_update)(record);
            true
        }
        None => false,
    }
}

fn deliver_error(callbacks: &SharedCallbacks, error: ChannelError) {
    let mut guard = lock(callbacks);
    if let Some(mut cbs) = guard.take() {
        tracing::warn!(%error, "update subscription failed");
        (cbs.on_error)(error);
    }
}

/// A live subscription. Dropping it cancels.
///
/// Callbacks run on a background task while an internal lock is held, so
/// [`cancel`](Self::cancel) waits for an in-flight callback to finish and
/// must not be called from inside one.
pub struct SubscriptionHandle {
    room_code: RoomCode,
    callbacks: SharedCallbacks,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionHandle {
    /// The room this subscription listens to.
    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// Whether callbacks can still fire.
    ///
    /// Becomes `false` after [`cancel`](Self::cancel) or after the channel
    /// reported an error.
    pub fn is_active(&self) -> bool {
        lock(&self.callbacks).is_some()
    }

    /// Stops the subscription. No callback fires after this returns.
    /// Calling it again is a no-op.
    pub fn cancel(&self) {
        let was_active = lock(&self.callbacks).take().is_some();
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
        if was_active {
            tracing::info!(room_code = %self.room_code, "subscription cancelled");
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("room_code", &self.room_code)
            .field("active", &self.is_active())
            .finish()
    }
}
