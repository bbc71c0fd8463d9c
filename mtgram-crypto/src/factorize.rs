//! Pollard-rho (Brent cycle detection) factorization for the handshake's PQ
//! proof-of-work.  `pq` is a product of two distinct ~31-bit primes, so a
//! handful of deterministic polynomial offsets always suffices.

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn modpow(mut base: u128, mut exp: u128, modulus: u128) -> u128 {
    if modulus == 1 {
        return 0;
    }
    let mut acc = 1;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc * base % modulus;
        }
        exp >>= 1;
        base = base * base % modulus;
    }
    acc
}

fn abs_sub(a: u128, b: u128) -> u128 {
    a.max(b) - a.min(b)
}

fn rho_with_offset(pq: u128, c: u128) -> (u64, u64) {
    if pq % 2 == 0 {
        return (2, (pq / 2) as u64);
    }

    let mut y = 3 * (pq / 7);
    let batch = 7 * (pq / 13);
    let mut g = 1u128;
    let mut r = 1u128;
    let mut q = 1u128;
    let mut x = 0u128;
    let mut ys = 0u128;

    while g == 1 {
        x = y;
        for _ in 0..r {
            y = (modpow(y, 2, pq) + c) % pq;
        }
        let mut k = 0;
        while k < r && g == 1 {
            ys = y;
            for _ in 0..batch.min(r - k) {
                y = (modpow(y, 2, pq) + c) % pq;
                q = q * abs_sub(x, y) % pq;
            }
            g = gcd(q, pq);
            k += batch;
        }
        r *= 2;
    }

    // The batched gcd can overshoot; backtrack one step at a time.
    if g == pq {
        loop {
            ys = (modpow(ys, 2, pq) + c) % pq;
            g = gcd(abs_sub(x, ys), pq);
            if g > 1 {
                break;
            }
        }
    }

    let p = g as u64;
    let q = (pq / g) as u64;
    (p.min(q), p.max(q))
}

/// Factorize `pq` into two factors `(p, q)` with `p ≤ q`.
///
/// Returns `None` when no offset splits `pq`, e.g. because it is prime.
pub fn factorize(pq: u64) -> Option<(u64, u64)> {
    let n = pq as u128;
    for attempt in [43u128, 47, 53, 59, 61] {
        let c = attempt * (n / 103);
        let (p, q) = rho_with_offset(n, c);
        if p != 1 {
            return Some((p, q));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pq_pairs() {
        assert_eq!(factorize(1470626929934143021), Some((1206429347, 1218991343)));
        assert_eq!(factorize(2363612107535801713), Some((1518968219, 1556064227)));
    }

    #[test]
    fn factors_recompose() {
        let (p, q) = factorize(1_000_036_000_099).unwrap();
        assert_eq!(p, 1_000_003);
        assert_eq!(q, 1_000_033);
        assert_eq!(p * q, 1_000_036_000_099);
    }

    #[test]
    fn prime_input_yields_none() {
        assert_eq!(factorize(1_000_000_007), None);
    }
}
