use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// Length of the public event slug used in invite links.
pub const SLUG_LEN: usize = 8;

const SESSION_TOKEN_LEN: usize = 32;

/// Short public identifier for an event. Uniqueness is settled by the
/// caller against the store (retry on collision).
pub fn new_slug() -> String {
    Uuid::new_v4().simple().to_string()[..SLUG_LEN].to_string()
}

/// Opaque bearer token identifying a host session.
pub fn new_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}
