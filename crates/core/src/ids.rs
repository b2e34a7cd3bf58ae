//! Identifier generation.

/// Fresh random identifier for tabs and injections.
pub fn guid() -> String {
	uuid::Uuid::new_v4().to_string()
}
