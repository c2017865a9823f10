use rand::Rng;

/// Generate a numeric code of `length` digits.
///
/// Each position is an independent uniform draw from `0..=9`, so digits may
/// repeat. Uses the thread-local RNG; not intended as a secret-grade source.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
