use rand::distributions::Alphanumeric;
use rand::Rng;

/// A random short-URL path of `length` characters from `[A-Za-z0-9]`.
pub fn random_path(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
