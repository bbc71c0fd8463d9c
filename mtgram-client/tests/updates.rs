//! Update reconciliation against a scripted difference source.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use mtgram_client::storage::BoxFuture;
use mtgram_client::{DifferenceSource, InvocationError, UpdatesHandler, UpdatesState};
use mtgram_tl::{enums, types};

// ── Scripted source ───────────────────────────────────────────────────────────

struct MockSource {
    state: types::updates::State,
    diffs: Mutex<VecDeque<enums::updates::Difference>>,
    difference_calls: AtomicUsize,
}

impl MockSource {
    fn new(diffs: Vec<enums::updates::Difference>) -> Self {
        Self {
            state: types::updates::State { pts: 0, qts: 0, date: 0, seq: 0, unread_count: 0 },
            diffs: Mutex::new(diffs.into()),
            difference_calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.difference_calls.load(Ordering::SeqCst)
    }
}

impl DifferenceSource for MockSource {
    fn get_state(&self) -> BoxFuture<'_, Result<types::updates::State, InvocationError>> {
        let state = self.state;
        Box::pin(async move { Ok(state) })
    }

    fn get_difference(
        &self,
        _pts: i32,
        _date: i32,
        _qts: i32,
    ) -> BoxFuture<'_, Result<enums::updates::Difference, InvocationError>> {
        self.difference_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.diffs.lock().unwrap().pop_front().unwrap_or(
            enums::updates::Difference::Empty(types::updates::DifferenceEmpty {
                date: 1000,
                seq: 0,
            }),
        );
        Box::pin(async move { Ok(next) })
    }
}

// ── Envelope builders ─────────────────────────────────────────────────────────

fn short_message(id: i32, pts: i32, date: i32) -> enums::Updates {
    enums::Updates::ShortMessage(types::UpdateShortMessage {
        out: false,
        id,
        user_id: 7,
        message: format!("msg {id}"),
        pts,
        pts_count: 1,
        date,
    })
}

fn new_message_update(id: i32, pts: i32) -> enums::Update {
    enums::Update::NewMessage(types::UpdateNewMessage {
        message: enums::Message::Message(types::Message {
            out: false,
            id,
            from_id: None,
            peer_id: enums::Peer::User(types::PeerUser { user_id: 7 }),
            reply_to_msg_id: None,
            date: 100,
            message: format!("msg {id}"),
        }),
        pts,
        pts_count: 1,
    })
}

fn combined(updates: Vec<enums::Update>, seq_start: i32, seq: i32) -> enums::Updates {
    enums::Updates::Combined(types::UpdatesCombined {
        updates,
        users: Vec::new(),
        chats: Vec::new(),
        date: 200,
        seq_start,
        seq,
    })
}

fn state(pts: i32, seq: i32) -> types::updates::State {
    types::updates::State { pts, qts: 0, date: 500, seq, unread_count: 0 }
}

// ── Ordered, exactly-once delivery ────────────────────────────────────────────

#[tokio::test]
async fn sequential_messages_are_delivered_in_order() {
    let source = MockSource::new(vec![]);
    let mut handler = UpdatesHandler::new(UpdatesState { pts: 10, ..Default::default() });

    let first = handler.process(short_message(1, 11, 100), &source).await.unwrap();
    let second = handler.process(short_message(2, 12, 101), &source).await.unwrap();

    assert_eq!(first.updates.len(), 1);
    assert_eq!(second.updates.len(), 1);
    assert_eq!(handler.state().pts, 12);
    assert_eq!(handler.state().date, 101);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn replayed_envelope_is_dropped() {
    let source = MockSource::new(vec![]);
    let mut handler = UpdatesHandler::new(UpdatesState { pts: 10, ..Default::default() });

    let first = handler.process(short_message(1, 11, 100), &source).await.unwrap();
    let replay = handler.process(short_message(1, 11, 100), &source).await.unwrap();

    assert_eq!(first.updates.len(), 1);
    assert!(replay.updates.is_empty(), "duplicate must not be delivered twice");
    assert_eq!(handler.state().pts, 11);
}

#[tokio::test]
async fn updates_without_counters_pass_through() {
    let source = MockSource::new(vec![]);
    let mut handler = UpdatesHandler::new(UpdatesState { pts: 10, ..Default::default() });

    let envelope = enums::Updates::Short(types::UpdateShort {
        update: enums::Update::UserStatus(types::UpdateUserStatus { user_id: 7, online: true }),
        date: 300,
    });
    let delivered = handler.process(envelope, &source).await.unwrap();

    assert_eq!(delivered.updates.len(), 1);
    assert_eq!(handler.state().pts, 10, "pts untouched by counterless updates");
    assert_eq!(handler.state().date, 300);
}

// ── Gap detection and back-fill ───────────────────────────────────────────────

#[tokio::test]
async fn pts_gap_fetches_difference_exactly_once() {
    let source = MockSource::new(vec![enums::updates::Difference::Difference(
        types::updates::Difference {
            new_messages: vec![enums::Message::Message(types::Message {
                out: false,
                id: 5,
                from_id: None,
                peer_id: enums::Peer::User(types::PeerUser { user_id: 7 }),
                reply_to_msg_id: None,
                date: 400,
                message: "missed".into(),
            })],
            other_updates: Vec::new(),
            chats: Vec::new(),
            users: Vec::new(),
            state: state(13, 2),
        },
    )]);
    let mut handler = UpdatesHandler::new(UpdatesState { pts: 10, ..Default::default() });

    // pts 13 with count 1 means 11 and 12 are missing.
    let delivered = handler.process(short_message(9, 13, 100), &source).await.unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(delivered.updates.len(), 1, "back-filled message is delivered instead");
    assert_eq!(handler.state().pts, 13);
    assert_eq!(handler.state().seq, 2);
}

#[tokio::test]
async fn difference_slices_are_drained() {
    let source = MockSource::new(vec![
        enums::updates::Difference::Slice(types::updates::DifferenceSlice {
            new_messages: Vec::new(),
            other_updates: vec![new_message_update(1, 11)],
            chats: Vec::new(),
            users: Vec::new(),
            intermediate_state: state(11, 1),
        }),
        enums::updates::Difference::Difference(types::updates::Difference {
            new_messages: Vec::new(),
            other_updates: vec![new_message_update(2, 12)],
            chats: Vec::new(),
            users: Vec::new(),
            state: state(12, 2),
        }),
    ]);
    let mut handler = UpdatesHandler::new(UpdatesState { pts: 10, ..Default::default() });

    let delivered = handler.sync(&source).await.unwrap();

    assert_eq!(source.calls(), 2, "slice means ask again from the intermediate state");
    assert_eq!(delivered.updates.len(), 2);
    assert_eq!(handler.state().pts, 12);
}

#[tokio::test]
async fn too_long_difference_jumps_the_checkpoint() {
    let source = MockSource::new(vec![enums::updates::Difference::TooLong(
        types::updates::DifferenceTooLong { pts: 9000 },
    )]);
    let mut handler = UpdatesHandler::new(UpdatesState { pts: 10, ..Default::default() });

    let delivered = handler.sync(&source).await.unwrap();

    assert!(delivered.updates.is_empty());
    assert_eq!(handler.state().pts, 9000);
}

#[tokio::test]
async fn backlog_too_long_envelope_resyncs() {
    let source = MockSource::new(vec![enums::updates::Difference::Empty(
        types::updates::DifferenceEmpty { date: 777, seq: 3 },
    )]);
    let mut handler = UpdatesHandler::new(UpdatesState { pts: 10, ..Default::default() });

    let envelope = enums::Updates::TooLong(types::UpdatesTooLong);
    let delivered = handler.process(envelope, &source).await.unwrap();

    assert!(delivered.updates.is_empty());
    assert_eq!(source.calls(), 1);
    assert_eq!(handler.state().date, 777);
    assert_eq!(handler.state().seq, 3);
}

// ── Containers ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn container_applies_when_seq_is_contiguous() {
    let source = MockSource::new(vec![]);
    let mut handler =
        UpdatesHandler::new(UpdatesState { pts: 10, seq: 4, ..Default::default() });

    let envelope = combined(
        vec![new_message_update(1, 11), new_message_update(2, 12)],
        5,
        6,
    );
    let delivered = handler.process(envelope, &source).await.unwrap();

    assert_eq!(delivered.updates.len(), 2);
    assert_eq!(handler.state().pts, 12);
    assert_eq!(handler.state().seq, 6, "seq advances once per container");
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn duplicate_container_is_dropped_whole() {
    let source = MockSource::new(vec![]);
    let mut handler =
        UpdatesHandler::new(UpdatesState { pts: 12, seq: 6, ..Default::default() });

    // seq_start 5 <= local seq 6: the whole container was already applied.
    let envelope = combined(vec![new_message_update(1, 11)], 5, 6);
    let delivered = handler.process(envelope, &source).await.unwrap();

    assert!(delivered.updates.is_empty());
    assert_eq!(handler.state().seq, 6);
}

#[tokio::test]
async fn container_seq_gap_triggers_resync() {
    let source = MockSource::new(vec![enums::updates::Difference::Difference(
        types::updates::Difference {
            new_messages: Vec::new(),
            other_updates: vec![new_message_update(3, 13)],
            chats: Vec::new(),
            users: Vec::new(),
            state: state(13, 8),
        },
    )]);
    let mut handler =
        UpdatesHandler::new(UpdatesState { pts: 10, seq: 4, ..Default::default() });

    // seq_start 7 with local seq 4: containers 5 and 6 are missing.
    let envelope = combined(vec![new_message_update(9, 14)], 7, 7);
    let delivered = handler.process(envelope, &source).await.unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(delivered.updates.len(), 1);
    assert_eq!(handler.state().seq, 8);
}

#[tokio::test]
async fn stale_elements_inside_container_are_skipped() {
    let source = MockSource::new(vec![]);
    let mut handler =
        UpdatesHandler::new(UpdatesState { pts: 12, seq: 4, ..Default::default() });

    // Contiguous container, but its first element was already seen via a
    // loose update.
    let envelope = combined(
        vec![new_message_update(1, 12), new_message_update(2, 13)],
        5,
        5,
    );
    let delivered = handler.process(envelope, &source).await.unwrap();

    assert_eq!(delivered.updates.len(), 1);
    assert_eq!(handler.state().pts, 13);
    assert_eq!(handler.state().seq, 5);
}

#[tokio::test]
async fn container_entities_are_surfaced_for_caching() {
    let source = MockSource::new(vec![]);
    let mut handler =
        UpdatesHandler::new(UpdatesState { pts: 10, seq: 4, ..Default::default() });

    let envelope = enums::Updates::Combined(types::UpdatesCombined {
        updates: vec![new_message_update(1, 11)],
        users: vec![enums::User::User(types::User { id: 7, ..Default::default() })],
        chats: vec![enums::Chat::Chat(types::Chat { id: 3, title: "g".into() })],
        date: 200,
        seq_start: 5,
        seq: 5,
    });
    let delivered = handler.process(envelope, &source).await.unwrap();

    assert_eq!(delivered.users.len(), 1);
    assert_eq!(delivered.chats.len(), 1);
}

// ── Local echo ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn own_updates_fast_forward_without_gap_checks() {
    let source = MockSource::new(vec![]);
    let mut handler = UpdatesHandler::new(UpdatesState { pts: 10, ..Default::default() });

    // pts jumps straight to 14; a pushed copy must then count as a duplicate.
    handler.apply_own(&new_message_update(1, 14));
    assert_eq!(handler.state().pts, 14);
    assert_eq!(source.calls(), 0, "local echo never fetches a difference");

    let replay = handler.process(short_message(1, 14, 100), &source).await.unwrap();
    assert!(replay.updates.is_empty());
}

// ── First-run state sync ──────────────────────────────────────────────────────

#[tokio::test]
async fn sync_state_adopts_server_checkpoint() {
    let mut source = MockSource::new(vec![]);
    source.state = state(42, 7);

    let mut handler = UpdatesHandler::new(UpdatesState::default());
    handler.sync_state(&source).await.unwrap();

    assert_eq!(handler.state(), UpdatesState { pts: 42, qts: 0, seq: 7, date: 500 });
}
