// Entity ids are UUIDv7 generated app-side so that ids sort by creation time
// across admins, applications and users alike.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new entity id in its canonical string form.
pub fn new_id() -> String {
    uuidv7().to_string()
}

/// Parse an externally supplied id. Anything that is not a UUID can never
/// name a stored entity, so callers treat `None` as "not found".
pub fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}
