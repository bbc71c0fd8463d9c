use mtgram_crypto::{decrypt_data, encrypt_data, AuthKey, Side};
use mtgram_mtproto::encrypted::DecryptError;
use mtgram_mtproto::{EncryptedSession, Message, MsgIdGen};
use mtgram_tl::{functions, Serializable};

// ── Message ids ───────────────────────────────────────────────────────────────

#[test]
fn msg_ids_are_monotonic_with_zero_lsbs() {
    let mut idgen = MsgIdGen::new(0);
    let mut prev = 0i64;
    for _ in 0..100 {
        let id = idgen.next();
        assert_eq!(id & 0b11, 0, "client msg_id must end in 0b00");
        assert!(id > prev, "msg_id must strictly increase");
        prev = id;
    }
}

#[test]
fn msg_id_upper_bits_track_corrected_time() {
    let a = MsgIdGen::new(0).next() >> 32;
    let b = MsgIdGen::new(500).next() >> 32;
    let skew = b - a;
    assert!((499..=501).contains(&skew), "skew was {skew}");
}

// ── Plaintext framing ─────────────────────────────────────────────────────────

#[test]
fn plaintext_frame_layout() {
    let msg = Message::plaintext(0x1122334455667700, vec![0xaa, 0xbb]);
    let wire = msg.to_bytes();

    assert_eq!(wire.len(), 8 + 8 + 4 + 2);
    assert_eq!(&wire[..8], &[0u8; 8], "auth_key_id must be 0 for plaintext");
    assert_eq!(u32::from_le_bytes(wire[16..20].try_into().unwrap()), 2);
    assert_eq!(&wire[20..], &[0xaa, 0xbb]);

    let parsed = Message::from_bytes(&wire).unwrap();
    assert_eq!(parsed.msg_id, 0x1122334455667700);
    assert_eq!(parsed.body, vec![0xaa, 0xbb]);
}

#[test]
fn plaintext_rejects_encrypted_frames() {
    use mtgram_mtproto::message::PlaintextError;
    let mut wire = Message::plaintext(4, vec![1, 2, 3, 4]).to_bytes();
    wire[0] = 0x99;
    assert!(matches!(
        Message::from_bytes(&wire),
        Err(PlaintextError::BadAuthKeyId { .. })
    ));
}

// ── Encrypted session ─────────────────────────────────────────────────────────

fn key_bytes() -> [u8; 256] {
    core::array::from_fn(|i| (i * 7) as u8)
}

#[test]
fn pack_produces_decryptable_frame_with_odd_seq() {
    let mut session = EncryptedSession::new(key_bytes(), 0x5a5a, 0);
    let call = functions::Ping { ping_id: 42 };
    let (mut wire, msg_id) = session.pack(&call);

    // Act as the receiving server.
    let key = AuthKey::from_bytes(key_bytes());
    let plain = decrypt_data(&mut wire, &key, Side::Client).unwrap();

    assert_eq!(i64::from_le_bytes(plain[..8].try_into().unwrap()), 0x5a5a);
    assert_eq!(
        i64::from_le_bytes(plain[8..16].try_into().unwrap()),
        session.session_id()
    );
    assert_eq!(i64::from_le_bytes(plain[16..24].try_into().unwrap()), msg_id);

    let seq_no = i32::from_le_bytes(plain[24..28].try_into().unwrap());
    assert_eq!(seq_no & 1, 1, "content-related seq_no must be odd");

    let len = u32::from_le_bytes(plain[28..32].try_into().unwrap()) as usize;
    assert_eq!(&plain[32..32 + len], call.to_bytes());
}

#[test]
fn unrelated_messages_use_even_seq_without_advancing() {
    let mut session = EncryptedSession::new(key_bytes(), 0, 0);
    let key = AuthKey::from_bytes(key_bytes());

    let seq_of = |wire: &mut Vec<u8>| {
        let plain = decrypt_data(wire, &key, Side::Client).unwrap();
        i32::from_le_bytes(plain[24..28].try_into().unwrap())
    };

    let (mut a, _) = session.pack(&functions::Ping { ping_id: 1 });
    let (mut b, _) = session.pack_unrelated(&mtgram_tl::types::MsgsAck { msg_ids: vec![9] });
    let (mut c, _) = session.pack(&functions::Ping { ping_id: 2 });

    assert_eq!(seq_of(&mut a), 1);
    assert_eq!(seq_of(&mut b), 2);
    assert_eq!(seq_of(&mut c), 3);
}

#[test]
fn pack_allocates_increasing_msg_ids() {
    let mut session = EncryptedSession::new(key_bytes(), 0, 0);
    let (_, first) = session.pack(&functions::Ping { ping_id: 1 });
    let (_, second) = session.pack(&functions::Ping { ping_id: 2 });
    assert!(second > first);
}

#[test]
fn unpack_reads_server_frames() {
    let session = EncryptedSession::new(key_bytes(), 7, 0);
    let body = functions::Ping { ping_id: 3 }.to_bytes();

    let mut inner = Vec::new();
    inner.extend(99i64.to_le_bytes());
    inner.extend(session.session_id().to_le_bytes());
    inner.extend(0x60000000_00000001i64.to_le_bytes());
    inner.extend(1i32.to_le_bytes());
    inner.extend((body.len() as u32).to_le_bytes());
    inner.extend(&body);

    let key = AuthKey::from_bytes(key_bytes());
    let mut frame = encrypt_data(&inner, &key, Side::Server);

    let msg = session.unpack(&mut frame).unwrap();
    assert_eq!(msg.salt, 99);
    assert_eq!(msg.msg_id, 0x60000000_00000001);
    assert_eq!(msg.body, body);
}

#[test]
fn unpack_rejects_foreign_session_id() {
    let session = EncryptedSession::new(key_bytes(), 0, 0);

    let mut inner = Vec::new();
    inner.extend(0i64.to_le_bytes());
    inner.extend((session.session_id() ^ 1).to_le_bytes());
    inner.extend(0i64.to_le_bytes());
    inner.extend(0i32.to_le_bytes());
    inner.extend(0u32.to_le_bytes());

    let key = AuthKey::from_bytes(key_bytes());
    let mut frame = encrypt_data(&inner, &key, Side::Server);

    assert!(matches!(
        session.unpack(&mut frame),
        Err(DecryptError::SessionMismatch)
    ));
}

#[test]
fn set_salt_applies_to_next_pack() {
    let mut session = EncryptedSession::new(key_bytes(), 1, 0);
    session.set_salt(0x77);

    let (mut wire, _) = session.pack(&functions::Ping { ping_id: 0 });
    let key = AuthKey::from_bytes(key_bytes());
    let plain = decrypt_data(&mut wire, &key, Side::Client).unwrap();
    assert_eq!(i64::from_le_bytes(plain[..8].try_into().unwrap()), 0x77);
}
