use uuid::Uuid;

/// Length of a generated room token
pub const ROOM_TOKEN_LEN: usize = 12;

/// Generate a short, shareable room token.
///
/// 48 random bits from a v4 UUID, hex encoded. Collisions are possible but
/// rare; stores retry on a clash.
pub fn generate_room_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(ROOM_TOKEN_LEN);
    token
}

/// Whether a client supplied room token is worth looking up at all
pub fn is_plausible_room_token(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && token.len() <= 128 && !token.chars().any(char::is_control)
}
