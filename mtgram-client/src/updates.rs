//! Update reconciliation.
//!
//! The server streams updates with per-category counters (`pts`, `qts`) plus
//! an envelope counter (`seq`).  [`UpdatesHandler`] checks every incoming
//! envelope against the local checkpoint and produces the updates that are
//! new, in order, exactly once.  On a detected gap it drops the tail of the
//! envelope and back-fills through `updates.getDifference`.

use mtgram_tl::{enums, types};

use crate::errors::InvocationError;
use crate::storage::BoxFuture;

/// The local update checkpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UpdatesState {
    /// Message-box counter.
    pub pts: i32,
    /// Secondary event counter.
    pub qts: i32,
    /// Envelope sequence number.
    pub seq: i32,
    /// Server date of the newest applied envelope.
    pub date: i32,
}

impl From<types::updates::State> for UpdatesState {
    fn from(s: types::updates::State) -> Self {
        Self { pts: s.pts, qts: s.qts, seq: s.seq, date: s.date }
    }
}

/// Where the handler fetches server state when it detects a gap.
///
/// [`crate::DataCenter`] implements this over live RPC; tests substitute a
/// scripted source.
pub trait DifferenceSource: Sync {
    /// `updates.getState`.
    fn get_state(&self) -> BoxFuture<'_, Result<types::updates::State, InvocationError>>;

    /// `updates.getDifference` starting from the given checkpoint.
    fn get_difference(
        &self,
        pts: i32,
        date: i32,
        qts: i32,
    ) -> BoxFuture<'_, Result<enums::updates::Difference, InvocationError>>;
}

/// What one envelope (or difference fetch) produced after reconciliation.
#[derive(Debug, Default)]
pub struct Reconciled {
    /// Updates to deliver, in order, each exactly once.
    pub updates: Vec<enums::Update>,
    /// Users referenced by the delivered updates, for the entity cache.
    pub users: Vec<enums::User>,
    /// Chats referenced by the delivered updates, for the entity cache.
    pub chats: Vec<enums::Chat>,
}

impl Reconciled {
    fn only(update: enums::Update) -> Self {
        Self { updates: vec![update], ..Default::default() }
    }
}

/// Outcome of checking one `pts` counter against the checkpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
enum PtsCheck {
    /// The counter advances the checkpoint exactly.
    Apply,
    /// Already applied.
    Duplicate,
    /// One or more updates are missing before this one.
    Gap,
}

/// Reconciles incoming update envelopes against a local checkpoint.
///
/// Not `Sync` by itself; the owner serializes access (the engine keeps it
/// behind a mutex in its event loop).
pub struct UpdatesHandler {
    state: UpdatesState,
    syncing: bool,
}

impl UpdatesHandler {
    /// Resume from a persisted checkpoint, or start empty and call
    /// [`UpdatesHandler::sync_state`] before processing.
    pub fn new(state: UpdatesState) -> Self {
        Self { state, syncing: false }
    }

    /// The current checkpoint, for persistence.
    pub fn state(&self) -> UpdatesState {
        self.state
    }

    /// Fetch a fresh checkpoint from the server, discarding history.  Used on
    /// first login, when there is nothing to back-fill from.
    pub async fn sync_state<S: DifferenceSource>(
        &mut self,
        source: &S,
    ) -> Result<(), InvocationError> {
        let state = source.get_state().await?;
        tracing::debug!(pts = state.pts, seq = state.seq, "synchronized fresh update state");
        self.state = state.into();
        Ok(())
    }

    fn check_pts(&self, pts: i32, pts_count: i32) -> PtsCheck {
        // applicable iff local_pts + pts_count == pts
        let expected = self.state.pts + pts_count;
        if expected == pts {
            PtsCheck::Apply
        } else if expected > pts {
            PtsCheck::Duplicate
        } else {
            PtsCheck::Gap
        }
    }

    /// Process one envelope.  Returns the updates to deliver, in order; on a
    /// gap the rest of the envelope is dropped and the difference is fetched
    /// instead, so the returned list already contains the back-filled
    /// updates.
    pub async fn process<S: DifferenceSource>(
        &mut self,
        updates: enums::Updates,
        source: &S,
    ) -> Result<Reconciled, InvocationError> {
        match updates {
            enums::Updates::TooLong(_) => {
                tracing::info!("server reports update backlog too long, resynchronizing");
                self.sync(source).await
            }
            enums::Updates::ShortMessage(short) => {
                let update = enums::Update::NewMessage(types::UpdateNewMessage {
                    message: enums::Message::Message(types::Message {
                        out: short.out,
                        id: short.id,
                        from_id: Some(enums::Peer::User(types::PeerUser {
                            user_id: short.user_id,
                        })),
                        peer_id: enums::Peer::User(types::PeerUser { user_id: short.user_id }),
                        reply_to_msg_id: None,
                        date: short.date,
                        message: short.message,
                    }),
                    pts: short.pts,
                    pts_count: short.pts_count,
                });
                self.process_loose(update, short.date, source).await
            }
            enums::Updates::ShortChatMessage(short) => {
                let update = enums::Update::NewMessage(types::UpdateNewMessage {
                    message: enums::Message::Message(types::Message {
                        out: short.out,
                        id: short.id,
                        from_id: Some(enums::Peer::User(types::PeerUser {
                            user_id: short.from_id,
                        })),
                        peer_id: enums::Peer::Chat(types::PeerChat { chat_id: short.chat_id }),
                        reply_to_msg_id: None,
                        date: short.date,
                        message: short.message,
                    }),
                    pts: short.pts,
                    pts_count: short.pts_count,
                });
                self.process_loose(update, short.date, source).await
            }
            enums::Updates::Short(short) => {
                self.process_loose(short.update, short.date, source).await
            }
            enums::Updates::Combined(combined) => {
                self.process_container(
                    combined.updates,
                    combined.users,
                    combined.chats,
                    combined.seq_start,
                    combined.seq,
                    combined.date,
                    source,
                )
                .await
            }
            enums::Updates::Updates(batch) => {
                // seq_start is implicit and equal to seq.
                self.process_container(
                    batch.updates,
                    batch.users,
                    batch.chats,
                    batch.seq,
                    batch.seq,
                    batch.date,
                    source,
                )
                .await
            }
        }
    }

    /// A single update outside any seq-carrying container.
    async fn process_loose<S: DifferenceSource>(
        &mut self,
        update: enums::Update,
        date: i32,
        source: &S,
    ) -> Result<Reconciled, InvocationError> {
        match update.pts() {
            None => {
                self.state.date = self.state.date.max(date);
                Ok(Reconciled::only(update))
            }
            Some((pts, pts_count)) => match self.check_pts(pts, pts_count) {
                PtsCheck::Apply => {
                    self.state.pts = pts;
                    self.state.date = self.state.date.max(date);
                    Ok(Reconciled::only(update))
                }
                PtsCheck::Duplicate => {
                    tracing::trace!(pts, "dropping duplicate update");
                    Ok(Reconciled::default())
                }
                PtsCheck::Gap => {
                    tracing::warn!(
                        local_pts = self.state.pts,
                        pts,
                        pts_count,
                        "pts gap detected, fetching difference"
                    );
                    self.sync(source).await
                }
            },
        }
    }

    /// A seq-carrying container.  The whole container is accepted or dropped
    /// based on its seq range; inside an accepted container, elements only
    /// fast-forward `pts` (duplicates dropped, no per-element gap checks).
    #[allow(clippy::too_many_arguments)]
    async fn process_container<S: DifferenceSource>(
        &mut self,
        updates: Vec<enums::Update>,
        users: Vec<enums::User>,
        chats: Vec<enums::Chat>,
        seq_start: i32,
        seq: i32,
        date: i32,
        source: &S,
    ) -> Result<Reconciled, InvocationError> {
        if seq_start != 0 {
            if seq_start <= self.state.seq {
                tracing::trace!(seq_start, local_seq = self.state.seq, "dropping duplicate container");
                return Ok(Reconciled::default());
            }
            if seq_start != self.state.seq + 1 {
                tracing::warn!(
                    local_seq = self.state.seq,
                    seq_start,
                    "seq gap detected, fetching difference"
                );
                return self.sync(source).await;
            }
        }

        let mut delivered = Vec::with_capacity(updates.len());
        for update in updates {
            match update.pts() {
                Some((pts, _)) if pts <= self.state.pts => {
                    tracing::trace!(pts, "dropping duplicate update inside container");
                }
                Some((pts, _)) => {
                    self.state.pts = pts;
                    delivered.push(update);
                }
                None => delivered.push(update),
            }
        }

        // seq and date advance once per container, not per element.
        if seq_start != 0 {
            self.state.seq = seq;
        }
        self.state.date = self.state.date.max(date);
        Ok(Reconciled { updates: delivered, users, chats })
    }

    /// Local echo: fold in an update produced by one of our own requests.
    /// Bypasses gap detection; the counters only fast-forward.
    pub fn apply_own(&mut self, update: &enums::Update) {
        if let Some((pts, _)) = update.pts() {
            if pts > self.state.pts {
                self.state.pts = pts;
            }
        }
    }

    /// Fetch everything missed since the checkpoint.  Reentrant calls while a
    /// fetch is already running are dropped, so one gap triggers one fetch.
    pub async fn sync<S: DifferenceSource>(
        &mut self,
        source: &S,
    ) -> Result<Reconciled, InvocationError> {
        if self.syncing {
            return Ok(Reconciled::default());
        }
        self.syncing = true;
        let result = self.sync_inner(source).await;
        self.syncing = false;
        result
    }

    async fn sync_inner<S: DifferenceSource>(
        &mut self,
        source: &S,
    ) -> Result<Reconciled, InvocationError> {
        let mut delivered = Reconciled::default();
        loop {
            let diff = source
                .get_difference(self.state.pts, self.state.date, self.state.qts)
                .await?;
            match diff {
                enums::updates::Difference::Empty(empty) => {
                    self.state.date = empty.date;
                    self.state.seq = empty.seq;
                    break;
                }
                enums::updates::Difference::Difference(diff) => {
                    self.collect_difference(
                        diff.new_messages,
                        diff.other_updates,
                        diff.users,
                        diff.chats,
                        &mut delivered,
                    );
                    self.state = diff.state.into();
                    break;
                }
                enums::updates::Difference::Slice(slice) => {
                    self.collect_difference(
                        slice.new_messages,
                        slice.other_updates,
                        slice.users,
                        slice.chats,
                        &mut delivered,
                    );
                    self.state = slice.intermediate_state.into();
                    // More to come; ask again from the intermediate state.
                }
                enums::updates::Difference::TooLong(too_long) => {
                    tracing::warn!(pts = too_long.pts, "difference too long, jumping checkpoint");
                    self.state.pts = too_long.pts;
                    break;
                }
            }
        }
        tracing::debug!(
            pts = self.state.pts,
            seq = self.state.seq,
            count = delivered.updates.len(),
            "difference applied"
        );
        Ok(delivered)
    }

    fn collect_difference(
        &self,
        new_messages: Vec<enums::Message>,
        other_updates: Vec<enums::Update>,
        users: Vec<enums::User>,
        chats: Vec<enums::Chat>,
        out: &mut Reconciled,
    ) {
        out.updates.extend(new_messages.into_iter().map(|message| {
            enums::Update::NewMessage(types::UpdateNewMessage {
                message,
                pts: self.state.pts,
                pts_count: 0,
            })
        }));
        out.updates.extend(other_updates);
        out.users.extend(users);
        out.chats.extend(chats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_arithmetic() {
        let handler = UpdatesHandler::new(UpdatesState { pts: 10, ..Default::default() });
        assert_eq!(handler.check_pts(11, 1), PtsCheck::Apply);
        assert_eq!(handler.check_pts(12, 2), PtsCheck::Apply);
        assert_eq!(handler.check_pts(10, 1), PtsCheck::Duplicate);
        assert_eq!(handler.check_pts(13, 1), PtsCheck::Gap);
    }

    #[test]
    fn state_round_trips_through_tl() {
        let tl = types::updates::State { pts: 1, qts: 2, date: 3, seq: 4, unread_count: 5 };
        let local: UpdatesState = tl.into();
        assert_eq!(local, UpdatesState { pts: 1, qts: 2, seq: 4, date: 3 });
    }
}
