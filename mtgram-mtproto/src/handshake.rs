//! Sans-IO authorization key generation.
//!
//! # Flow
//!
//! ```text
//! let (req, s1) = handshake::step1()?;
//! // send req, receive resp
//! let (req, s2) = handshake::step2(s1, resp, &keys)?;
//! // send req, receive resp
//! let (req, s3) = handshake::step3(s2, resp)?;
//! // send req, receive resp
//! let done = handshake::finish(s3, resp)?;
//! // done.auth_key is ready
//! ```
//!
//! Each step is deterministic given its random input, so the whole exchange
//! can be driven without a socket.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use mtgram_crypto::{aes, factorize, generate_key_data_from_nonce, rsa, AuthKey};
use mtgram_crypto::sha1;
use mtgram_tl::{enums, functions, types, Cursor, Deserializable, Serializable};
use num_bigint::{BigUint, ToBigUint};

// ─── Pinned keys ─────────────────────────────────────────────────────────────

/// An RSA public key the caller trusts, matched against the fingerprints the
/// server advertises in `resPQ`.
pub struct PinnedKey {
    /// The 64-bit fingerprint the server refers to this key by.
    pub fingerprint: i64,
    /// The public key itself.
    pub key: rsa::Key,
}

impl PinnedKey {
    /// Pin a key from decimal `n` and `e` strings.
    pub fn new(n: &str, e: &str) -> Option<Self> {
        let key = rsa::Key::new(n, e)?;
        Some(Self { fingerprint: key.fingerprint(), key })
    }
}

// ─── Error ───────────────────────────────────────────────────────────────────

/// Errors that can occur during auth key generation.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    InvalidNonce { got: [u8; 16], expected: [u8; 16] },
    InvalidPqSize { size: usize },
    /// The advertised pq did not split into two factors.
    FactorizationFailed { pq: u64 },
    /// None of the advertised fingerprints matches a pinned key.
    NoMatchingKey { fingerprints: Vec<i64> },
    DhParamsFail,
    InvalidServerNonce { got: [u8; 16], expected: [u8; 16] },
    EncryptedResponseNotPadded { len: usize },
    /// The decrypted answer cannot even hold its own SHA-1 prefix.
    EncryptedResponseTooShort { len: usize },
    InvalidDhPrimeSize { bits: u64 },
    InvalidDhInnerData { error: mtgram_tl::deserialize::Error },
    GParameterOutOfRange { value: BigUint, low: BigUint, high: BigUint },
    DhGenRetry,
    DhGenFail,
    InvalidAnswerHash { got: [u8; 20], expected: [u8; 20] },
    InvalidNewNonceHash { got: [u8; 16], expected: [u8; 16] },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNonce { got, expected } => {
                write!(f, "nonce mismatch: got {got:?}, expected {expected:?}")
            }
            Self::InvalidPqSize { size } => write!(f, "pq size {size} invalid (expected 8)"),
            Self::FactorizationFailed { pq } => write!(f, "pq {pq} did not factorize"),
            Self::NoMatchingKey { fingerprints } => {
                write!(f, "no pinned key for any of {fingerprints:?}")
            }
            Self::DhParamsFail => write!(f, "server returned DH params failure"),
            Self::InvalidServerNonce { got, expected } => {
                write!(f, "server_nonce mismatch: got {got:?}, expected {expected:?}")
            }
            Self::EncryptedResponseNotPadded { len } => {
                write!(f, "encrypted answer len {len} is not 16-byte aligned")
            }
            Self::EncryptedResponseTooShort { len } => {
                write!(f, "encrypted answer len {len} is too short for the answer hash")
            }
            Self::InvalidDhPrimeSize { bits } => {
                write!(f, "dh_prime is {bits} bits (expected 2048)")
            }
            Self::InvalidDhInnerData { error } => {
                write!(f, "DH inner data deserialization error: {error}")
            }
            Self::GParameterOutOfRange { value, low, high } => {
                write!(f, "g={value} not in range ({low}, {high})")
            }
            Self::DhGenRetry => write!(f, "DH gen retry requested"),
            Self::DhGenFail => write!(f, "DH gen failed"),
            Self::InvalidAnswerHash { got, expected } => {
                write!(f, "answer hash mismatch: got {got:?}, expected {expected:?}")
            }
            Self::InvalidNewNonceHash { got, expected } => {
                write!(f, "new nonce hash mismatch: got {got:?}, expected {expected:?}")
            }
        }
    }
}

// ─── Step state ──────────────────────────────────────────────────────────────

/// State after step 1.
#[derive(Debug)]
pub struct Step1 {
    nonce: [u8; 16],
}

/// State after step 2.
#[derive(Debug)]
pub struct Step2 {
    nonce: [u8; 16],
    server_nonce: [u8; 16],
    new_nonce: [u8; 32],
}

/// State after step 3.
#[derive(Debug)]
pub struct Step3 {
    nonce: [u8; 16],
    server_nonce: [u8; 16],
    new_nonce: [u8; 32],
    gab: BigUint,
    time_offset: i32,
}

/// The final output of a successful handshake.
#[derive(Clone, Debug, PartialEq)]
pub struct Finished {
    /// The 256-byte authorization key.
    pub auth_key: [u8; 256],
    /// Clock skew in seconds relative to the server.
    pub time_offset: i32,
    /// Initial server salt.
    pub first_salt: i64,
}

// ─── Step 1: req_pq_multi ────────────────────────────────────────────────────

/// Generate a `req_pq_multi` request.  Returns the request plus opaque state.
pub fn step1() -> Result<(functions::ReqPqMulti, Step1), Error> {
    let mut buf = [0u8; 16];
    getrandom::getrandom(&mut buf).expect("getrandom");
    do_step1(&buf)
}

fn do_step1(random: &[u8; 16]) -> Result<(functions::ReqPqMulti, Step1), Error> {
    let nonce = *random;
    Ok((functions::ReqPqMulti { nonce }, Step1 { nonce }))
}

// ─── Step 2: req_DH_params ───────────────────────────────────────────────────

/// Process `resPQ` and generate `req_DH_params`.
///
/// `keys` are the caller's pinned RSA keys; the first advertised fingerprint
/// with a match wins.
pub fn step2(
    data: Step1,
    response: types::ResPq,
    keys: &[PinnedKey],
) -> Result<(functions::ReqDhParams, Step2), Error> {
    let mut rnd = [0u8; 267]; // 32 for new_nonce, 235 for RSA padding
    getrandom::getrandom(&mut rnd).expect("getrandom");
    do_step2(data, response, keys, &rnd)
}

fn do_step2(
    data: Step1,
    response: types::ResPq,
    keys: &[PinnedKey],
    random: &[u8; 267],
) -> Result<(functions::ReqDhParams, Step2), Error> {
    let Step1 { nonce } = data;
    let res_pq = response;

    check_nonce(&res_pq.nonce, &nonce)?;

    if res_pq.pq.len() != 8 {
        return Err(Error::InvalidPqSize { size: res_pq.pq.len() });
    }

    let pq = u64::from_be_bytes(res_pq.pq.as_slice().try_into().unwrap());
    let (p, q) = factorize(pq).ok_or(Error::FactorizationFailed { pq })?;
    log::debug!("factorized pq={pq} into p={p}, q={q}");

    let mut new_nonce = [0u8; 32];
    new_nonce.copy_from_slice(&random[..32]);
    let rnd235: &[u8; 235] = random[32..].try_into().unwrap();

    fn trim_be(v: u64) -> Vec<u8> {
        let b = v.to_be_bytes();
        let skip = b.iter().position(|&x| x != 0).unwrap_or(7);
        b[skip..].to_vec()
    }

    let p_bytes = trim_be(p);
    let q_bytes = trim_be(q);

    let pq_inner = types::PqInnerData {
        pq: pq.to_be_bytes().to_vec(),
        p: p_bytes.clone(),
        q: q_bytes.clone(),
        nonce,
        server_nonce: res_pq.server_nonce,
        new_nonce,
    }
    .to_bytes();

    let pinned = res_pq
        .server_public_key_fingerprints
        .iter()
        .find_map(|fp| keys.iter().find(|k| k.fingerprint == *fp))
        .ok_or_else(|| Error::NoMatchingKey {
            fingerprints: res_pq.server_public_key_fingerprints.clone(),
        })?;

    let ciphertext = rsa::encrypt_hashed(&pq_inner, &pinned.key, rnd235);

    Ok((
        functions::ReqDhParams {
            nonce,
            server_nonce: res_pq.server_nonce,
            p: p_bytes,
            q: q_bytes,
            public_key_fingerprint: pinned.fingerprint,
            encrypted_data: ciphertext,
        },
        Step2 { nonce, server_nonce: res_pq.server_nonce, new_nonce },
    ))
}

// ─── Step 3: set_client_DH_params ────────────────────────────────────────────

/// Process `Server_DH_Params` and generate `set_client_DH_params`.
pub fn step3(
    data: Step2,
    response: enums::ServerDhParams,
) -> Result<(functions::SetClientDhParams, Step3), Error> {
    let mut rnd = [0u8; 272]; // 256 for the DH exponent, 16 for padding
    getrandom::getrandom(&mut rnd).expect("getrandom");
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i32;
    do_step3(data, response, &rnd, now)
}

fn do_step3(
    data: Step2,
    response: enums::ServerDhParams,
    random: &[u8; 272],
    now: i32,
) -> Result<(functions::SetClientDhParams, Step3), Error> {
    let Step2 { nonce, server_nonce, new_nonce } = data;

    let mut server_dh_ok = match response {
        enums::ServerDhParams::Fail(f) => {
            check_nonce(&f.nonce, &nonce)?;
            check_server_nonce(&f.server_nonce, &server_nonce)?;
            let digest = sha1!(new_nonce);
            let mut expected_hash = [0u8; 16];
            expected_hash.copy_from_slice(&digest[4..]);
            check_new_nonce_hash(&f.new_nonce_hash, &expected_hash)?;
            return Err(Error::DhParamsFail);
        }
        enums::ServerDhParams::Ok(x) => x,
    };

    check_nonce(&server_dh_ok.nonce, &nonce)?;
    check_server_nonce(&server_dh_ok.server_nonce, &server_nonce)?;

    if server_dh_ok.encrypted_answer.len() % 16 != 0 {
        return Err(Error::EncryptedResponseNotPadded {
            len: server_dh_ok.encrypted_answer.len(),
        });
    }

    let (key, iv) = generate_key_data_from_nonce(&server_nonce, &new_nonce);
    aes::ige_decrypt(&mut server_dh_ok.encrypted_answer, &key, &iv);
    let plain = server_dh_ok.encrypted_answer;

    if plain.len() < 20 {
        return Err(Error::EncryptedResponseTooShort { len: plain.len() });
    }
    let got_hash: [u8; 20] = plain[..20].try_into().unwrap();
    let mut cursor = Cursor::from_slice(&plain[20..]);

    let inner = match types::ServerDhInnerData::deserialize(&mut cursor) {
        Ok(x) => x,
        Err(e) => return Err(Error::InvalidDhInnerData { error: e }),
    };

    let expected_hash = sha1!(&plain[20..20 + cursor.pos()]);
    if got_hash != expected_hash {
        return Err(Error::InvalidAnswerHash { got: got_hash, expected: expected_hash });
    }

    check_nonce(&inner.nonce, &nonce)?;
    check_server_nonce(&inner.server_nonce, &server_nonce)?;

    let dh_prime = BigUint::from_bytes_be(&inner.dh_prime);
    if dh_prime.bits() != 2048 {
        return Err(Error::InvalidDhPrimeSize { bits: dh_prime.bits() });
    }
    // A negative g folds to zero and is rejected by the range check.
    let g = inner.g.to_biguint().unwrap_or_default();
    let g_a = BigUint::from_bytes_be(&inner.g_a);
    let time_offset = inner.server_time - now;

    // Reject degenerate or small-subgroup parameters before using the key.
    let one = BigUint::from(1u32);
    let safety = one.clone() << (2048 - 64);
    check_g_in_range(&g, &one, &(&dh_prime - &one))?;
    check_g_in_range(&g_a, &one, &(&dh_prime - &one))?;
    check_g_in_range(&g_a, &safety, &(&dh_prime - &safety))?;

    let b = BigUint::from_bytes_be(&random[..256]);
    let g_b = g.modpow(&b, &dh_prime);
    let gab = g_a.modpow(&b, &dh_prime);
    check_g_in_range(&g_b, &one, &(&dh_prime - &one))?;
    check_g_in_range(&g_b, &safety, &(&dh_prime - &safety))?;

    let client_dh_inner = types::ClientDhInnerData {
        nonce,
        server_nonce,
        retry_id: 0,
        g_b: g_b.to_bytes_be(),
    }
    .to_bytes();

    let digest = sha1!(&client_dh_inner);
    let pad_len = (16 - ((20 + client_dh_inner.len()) % 16)) % 16;
    let rnd16 = &random[256..];

    let mut hashed = Vec::with_capacity(20 + client_dh_inner.len() + pad_len);
    hashed.extend_from_slice(&digest);
    hashed.extend_from_slice(&client_dh_inner);
    hashed.extend_from_slice(&rnd16[..pad_len]);

    aes::ige_encrypt(&mut hashed, &key, &iv);

    Ok((
        functions::SetClientDhParams { nonce, server_nonce, encrypted_data: hashed },
        Step3 { nonce, server_nonce, new_nonce, gab, time_offset },
    ))
}

// ─── finish ──────────────────────────────────────────────────────────────────

/// Finalize the handshake.  Returns the ready [`Finished`] on success.
pub fn finish(
    data: Step3,
    response: enums::SetClientDhParamsAnswer,
) -> Result<Finished, Error> {
    let Step3 { nonce, server_nonce, new_nonce, gab, time_offset } = data;

    struct DhData {
        nonce: [u8; 16],
        server_nonce: [u8; 16],
        hash: [u8; 16],
        num: u8,
    }

    let dh = match response {
        enums::SetClientDhParamsAnswer::Ok(x) => DhData {
            nonce: x.nonce,
            server_nonce: x.server_nonce,
            hash: x.new_nonce_hash1,
            num: 1,
        },
        enums::SetClientDhParamsAnswer::Retry(x) => DhData {
            nonce: x.nonce,
            server_nonce: x.server_nonce,
            hash: x.new_nonce_hash2,
            num: 2,
        },
        enums::SetClientDhParamsAnswer::Fail(x) => DhData {
            nonce: x.nonce,
            server_nonce: x.server_nonce,
            hash: x.new_nonce_hash3,
            num: 3,
        },
    };

    check_nonce(&dh.nonce, &nonce)?;
    check_server_nonce(&dh.server_nonce, &server_nonce)?;

    let mut key_bytes = [0u8; 256];
    let gab_bytes = gab.to_bytes_be();
    let skip = 256 - gab_bytes.len();
    key_bytes[skip..].copy_from_slice(&gab_bytes);

    let auth_key = AuthKey::from_bytes(key_bytes);
    let expected_hash = auth_key.calc_new_nonce_hash(&new_nonce, dh.num);
    check_new_nonce_hash(&dh.hash, &expected_hash)?;

    let first_salt = {
        let mut buf = [0u8; 8];
        for ((dst, a), b) in buf.iter_mut().zip(&new_nonce[..8]).zip(&server_nonce[..8]) {
            *dst = a ^ b;
        }
        i64::from_le_bytes(buf)
    };

    match dh.num {
        1 => Ok(Finished { auth_key: auth_key.to_bytes(), time_offset, first_salt }),
        2 => Err(Error::DhGenRetry),
        _ => Err(Error::DhGenFail),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn check_nonce(got: &[u8; 16], expected: &[u8; 16]) -> Result<(), Error> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::InvalidNonce { got: *got, expected: *expected })
    }
}

fn check_server_nonce(got: &[u8; 16], expected: &[u8; 16]) -> Result<(), Error> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::InvalidServerNonce { got: *got, expected: *expected })
    }
}

fn check_new_nonce_hash(got: &[u8; 16], expected: &[u8; 16]) -> Result<(), Error> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::InvalidNewNonceHash { got: *got, expected: *expected })
    }
}

fn check_g_in_range(val: &BigUint, lo: &BigUint, hi: &BigUint) -> Result<(), Error> {
    if lo < val && val < hi {
        Ok(())
    } else {
        Err(Error::GParameterOutOfRange {
            value: val.clone(),
            low: lo.clone(),
            high: hi.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DH_PRIME_HEX: &str = "\
        C71CAEB9C6B1C9048E6C522F70F13F73980D40238E3E21C14934D037563D930F\
        48198A0AA7C14058229493D22530F4DBFA336F6E0AC925139543AED44CCE7C37\
        20FD51F69458705AC68CD4FE6B6B13ABDC9746512969328454F18FAF8C595F64\
        2477FE96BB2A941D5BCD1D4AC8CC49880708FA9B378E3C4F3A9060BEE67CF9A4\
        A4A695811051907E162753B56B0F6B410DBA74D8A84B2A14B3144E0EF1284754\
        FD17ED950D5965B4B9DD46582DB1178D169C6BC465B0D6FF9CA3928FEF5B9AE4\
        E418FC15E83EBEA0F87FA9FF5EED70050DED2849F47BF959D956850CE929851F\
        0D8115F635B105EE2E4E15D04B2454BF6F4FADF034B10403119CD8E3B92FCC5B";

    fn hex_bytes(s: &str) -> Vec<u8> {
        let chars: Vec<u8> = s.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
        chars
            .chunks(2)
            .map(|pair| {
                let hi = (pair[0] as char).to_digit(16).unwrap() as u8;
                let lo = (pair[1] as char).to_digit(16).unwrap() as u8;
                (hi << 4) | lo
            })
            .collect()
    }

    // A 512-bit RSA key is enough to exercise the framing; n/e are decimal.
    fn test_pinned_key() -> PinnedKey {
        PinnedKey::new(
            "9402690372368498142965879019737870140029866083029569485236113224897683268670407858690936708298096807221961379679874869894183913437641282210105922296103127",
            "65537",
        )
        .unwrap()
    }

    struct TestServer {
        server_nonce: [u8; 16],
        a: BigUint,
        dh_prime: BigUint,
        g_a: BigUint,
        new_nonce: [u8; 32],
        gab: Option<BigUint>,
    }

    impl TestServer {
        fn new(new_nonce: [u8; 32]) -> Self {
            let dh_prime = BigUint::from_bytes_be(&hex_bytes(DH_PRIME_HEX));
            let a = BigUint::from_bytes_be(&[0x5eu8; 256]);
            let g_a = BigUint::from(3u32).modpow(&a, &dh_prime);
            Self {
                server_nonce: [0xabu8; 16],
                a,
                dh_prime,
                g_a,
                new_nonce,
                gab: None,
            }
        }

        fn res_pq(&self, nonce: [u8; 16], fingerprint: i64) -> types::ResPq {
            types::ResPq {
                nonce,
                server_nonce: self.server_nonce,
                pq: 0x17ED48941A08F981u64.to_be_bytes().to_vec(),
                server_public_key_fingerprints: vec![fingerprint],
            }
        }

        fn dh_params(&self, nonce: [u8; 16], server_time: i32) -> enums::ServerDhParams {
            self.encrypt_answer(&types::ServerDhInnerData {
                nonce,
                server_nonce: self.server_nonce,
                g: 3,
                dh_prime: self.dh_prime.to_bytes_be(),
                g_a: self.g_a.to_bytes_be(),
                server_time,
            })
        }

        fn encrypt_answer(&self, inner: &types::ServerDhInnerData) -> enums::ServerDhParams {
            let inner_bytes = inner.to_bytes();
            let mut plain = Vec::new();
            plain.extend_from_slice(&sha1!(&inner_bytes));
            plain.extend_from_slice(&inner_bytes);
            while plain.len() % 16 != 0 {
                plain.push(0);
            }

            let (key, iv) = generate_key_data_from_nonce(&self.server_nonce, &self.new_nonce);
            aes::ige_encrypt(&mut plain, &key, &iv);

            enums::ServerDhParams::Ok(types::ServerDhParamsOk {
                nonce: inner.nonce,
                server_nonce: self.server_nonce,
                encrypted_answer: plain,
            })
        }

        fn accept_client_dh(
            &mut self,
            nonce: [u8; 16],
            req: &functions::SetClientDhParams,
        ) -> enums::SetClientDhParamsAnswer {
            let (key, iv) = generate_key_data_from_nonce(&self.server_nonce, &self.new_nonce);
            let mut plain = req.encrypted_data.clone();
            aes::ige_decrypt(&mut plain, &key, &iv);

            let mut cursor = Cursor::from_slice(&plain[20..]);
            let inner = types::ClientDhInnerData::deserialize(&mut cursor).unwrap();
            assert_eq!(&plain[..20], sha1!(&plain[20..20 + cursor.pos()]));

            let g_b = BigUint::from_bytes_be(&inner.g_b);
            let gab = g_b.modpow(&self.a, &self.dh_prime);

            let mut key_bytes = [0u8; 256];
            let gab_bytes = gab.to_bytes_be();
            key_bytes[256 - gab_bytes.len()..].copy_from_slice(&gab_bytes);
            self.gab = Some(gab);

            let auth_key = AuthKey::from_bytes(key_bytes);
            enums::SetClientDhParamsAnswer::Ok(types::DhGenOk {
                nonce,
                server_nonce: self.server_nonce,
                new_nonce_hash1: auth_key.calc_new_nonce_hash(&self.new_nonce, 1),
            })
        }
    }

    fn reach_step2(seed: u8) -> (TestServer, functions::ReqDhParams, Step2) {
        let pinned = test_pinned_key();
        let (req1, s1) = do_step1(&[seed; 16]).unwrap();
        let server = TestServer::new([seed; 32]);
        let res_pq = server.res_pq(req1.nonce, pinned.fingerprint);
        let mut rnd267 = [0u8; 267];
        rnd267[..32].copy_from_slice(&[seed; 32]);
        let (req2, s2) = do_step2(s1, res_pq, &[pinned], &rnd267).unwrap();
        (server, req2, s2)
    }

    fn run_handshake(now: i32, server_time: i32) -> (Finished, TestServer) {
        let pinned = test_pinned_key();

        let (req1, s1) = do_step1(&[0x44u8; 16]).unwrap();
        let mut server = TestServer::new([0x77u8; 32]);
        let res_pq = server.res_pq(req1.nonce, pinned.fingerprint);

        let mut rnd267 = [0u8; 267];
        rnd267[..32].copy_from_slice(&[0x77u8; 32]); // new_nonce the server test double knows
        let (req2, s2) = do_step2(s1, res_pq, &[pinned], &rnd267).unwrap();

        // PQ proof: the canonical factors of the example pq.
        assert_eq!(req2.p, 0x494C553Bu32.to_be_bytes().to_vec());
        assert_eq!(req2.q, 0x53911073u32.to_be_bytes().to_vec());

        let dh_params = server.dh_params(req2.nonce, server_time);
        let (req3, s3) = do_step3(s2, dh_params, &[0x31u8; 272], now).unwrap();

        let answer = server.accept_client_dh(req3.nonce, &req3);
        let finished = finish(s3, answer).unwrap();
        (finished, server)
    }

    #[test]
    fn full_handshake_derives_shared_key() {
        let (finished, server) = run_handshake(1_700_000_000, 1_700_000_007);

        let gab = server.gab.unwrap();
        let mut expected = [0u8; 256];
        let gab_bytes = gab.to_bytes_be();
        expected[256 - gab_bytes.len()..].copy_from_slice(&gab_bytes);

        assert_eq!(finished.auth_key, expected);
        assert_eq!(finished.time_offset, 7);
    }

    #[test]
    fn first_salt_mixes_nonces() {
        let (finished, server) = run_handshake(0, 0);
        let mut buf = [0u8; 8];
        for ((dst, a), b) in buf
            .iter_mut()
            .zip(&server.new_nonce[..8])
            .zip(&server.server_nonce[..8])
        {
            *dst = a ^ b;
        }
        assert_eq!(finished.first_salt, i64::from_le_bytes(buf));
    }

    #[test]
    fn handshake_is_deterministic() {
        let (a, _) = run_handshake(100, 100);
        let (b, _) = run_handshake(100, 100);
        assert_eq!(a, b);
    }

    #[test]
    fn step2_rejects_unknown_fingerprints() {
        let (req1, s1) = do_step1(&[1u8; 16]).unwrap();
        let server = TestServer::new([2u8; 32]);
        let res_pq = server.res_pq(req1.nonce, 0x1234);
        let err = do_step2(s1, res_pq, &[test_pinned_key()], &[0u8; 267]).unwrap_err();
        assert_eq!(err, Error::NoMatchingKey { fingerprints: vec![0x1234] });
    }

    #[test]
    fn step2_rejects_foreign_nonce() {
        let (_, s1) = do_step1(&[1u8; 16]).unwrap();
        let server = TestServer::new([2u8; 32]);
        let res_pq = server.res_pq([9u8; 16], 0);
        let err = do_step2(s1, res_pq, &[], &[0u8; 267]).unwrap_err();
        assert!(matches!(err, Error::InvalidNonce { .. }));
    }

    #[test]
    fn step3_rejects_tampered_answer() {
        let pinned = test_pinned_key();
        let (req1, s1) = do_step1(&[3u8; 16]).unwrap();
        let server = TestServer::new([5u8; 32]);
        let res_pq = server.res_pq(req1.nonce, pinned.fingerprint);

        let mut rnd267 = [0u8; 267];
        rnd267[..32].copy_from_slice(&[5u8; 32]);
        let (req2, s2) = do_step2(s1, res_pq, &[pinned], &rnd267).unwrap();

        let mut dh_params = server.dh_params(req2.nonce, 0);
        if let enums::ServerDhParams::Ok(ref mut ok) = dh_params {
            ok.encrypted_answer[40] ^= 0xff;
        }
        let err = do_step3(s2, dh_params, &[0u8; 272], 0).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAnswerHash { .. } | Error::InvalidDhInnerData { .. }
        ));
    }

    #[test]
    fn step2_rejects_unfactorable_pq() {
        let pinned = test_pinned_key();
        let (req1, s1) = do_step1(&[8u8; 16]).unwrap();
        let server = TestServer::new([8u8; 32]);
        let mut res_pq = server.res_pq(req1.nonce, pinned.fingerprint);
        res_pq.pq = 1_000_000_007u64.to_be_bytes().to_vec();
        let err = do_step2(s1, res_pq, &[pinned], &[0u8; 267]).unwrap_err();
        assert_eq!(err, Error::FactorizationFailed { pq: 1_000_000_007 });
    }

    #[test]
    fn step3_rejects_truncated_answer() {
        let (server, req2, s2) = reach_step2(0x11);
        // 16 zero bytes pass the alignment check but cannot hold the hash.
        let short = enums::ServerDhParams::Ok(types::ServerDhParamsOk {
            nonce: req2.nonce,
            server_nonce: server.server_nonce,
            encrypted_answer: vec![0u8; 16],
        });
        let err = do_step3(s2, short, &[0u8; 272], 0).unwrap_err();
        assert_eq!(err, Error::EncryptedResponseTooShort { len: 16 });
    }

    #[test]
    fn step3_rejects_negative_g() {
        let (server, req2, s2) = reach_step2(0x22);
        let dh_params = server.encrypt_answer(&types::ServerDhInnerData {
            nonce: req2.nonce,
            server_nonce: server.server_nonce,
            g: -3,
            dh_prime: server.dh_prime.to_bytes_be(),
            g_a: server.g_a.to_bytes_be(),
            server_time: 0,
        });
        let err = do_step3(s2, dh_params, &[0x31u8; 272], 0).unwrap_err();
        assert!(matches!(err, Error::GParameterOutOfRange { .. }));
    }

    #[test]
    fn step3_rejects_undersized_dh_prime() {
        let (server, req2, s2) = reach_step2(0x33);
        let dh_params = server.encrypt_answer(&types::ServerDhInnerData {
            nonce: req2.nonce,
            server_nonce: server.server_nonce,
            g: 3,
            dh_prime: vec![0x17],
            g_a: vec![0x02],
            server_time: 0,
        });
        let err = do_step3(s2, dh_params, &[0x31u8; 272], 0).unwrap_err();
        assert_eq!(err, Error::InvalidDhPrimeSize { bits: 5 });
    }
}
