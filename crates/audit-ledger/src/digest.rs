use sha2::{Digest, Sha256};

use crate::canonical::HashedFields;
use crate::errors::LedgerError;

/// `hex(SHA-256(canonical(fields) ‖ previous_hash))`, where a genesis entry
/// contributes nothing for the previous hash.
pub fn chain_hash(
    fields: &HashedFields<'_>,
    previous_hash: Option<&str>,
) -> Result<String, LedgerError> {
    let canonical = fields.canonical()?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    if let Some(previous) = previous_hash {
        hasher.update(previous.as_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuditAction;
    use chrono::{TimeZone, Utc};
    use fleetguard_core_types::{CompanyId, EntityId, UserId};
    use serde_json::json;

    #[test]
    fn previous_hash_changes_the_digest() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let changes = json!({"odometer": 120_000});
        let fields = HashedFields {
            company_id: CompanyId(1),
            user_id: UserId(2),
            action: AuditAction::VehicleUpdated,
            entity_type: "vehicle",
            entity_id: EntityId(3),
            timestamp: &ts,
            changes: &changes,
        };

        let genesis = chain_hash(&fields, None).unwrap();
        let linked = chain_hash(&fields, Some(&genesis)).unwrap();
        assert_eq!(genesis.len(), 64);
        assert!(genesis.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(genesis, linked);
        assert_eq!(genesis, chain_hash(&fields, None).unwrap());
    }
}
