use forge_core::error::ForgeError;
use forge_core::records::{AdmissionRecord, ParticipantActivity, ParticipantStatus};
use forge_core::types::{AdmissionId, ParticipantId, PaymentRef, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

fn storage(e: sled::Error) -> ForgeError {
    ForgeError::Storage(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ForgeError> {
    bincode::serialize(value).map_err(|e| ForgeError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ForgeError> {
    bincode::deserialize(bytes).map_err(|e| ForgeError::Serialization(e.to_string()))
}

fn key_32(key: &[u8]) -> Result<[u8; 32], ForgeError> {
    <[u8; 32]>::try_from(key)
        .map_err(|_| ForgeError::Storage(format!("malformed key of {} bytes", key.len())))
}

/// Persistent forge database backed by sled.
///
/// Named trees:
///   admissions     AdmissionId bytes   → bincode(AdmissionRecord)
///   participants   ParticipantId bytes → bincode(ParticipantStatus)
///   activity       ParticipantId bytes → bincode(ParticipantActivity)
///   consumed_refs  PaymentRef bytes    → AdmissionId bytes
///   velocity       u64 BE log index    → i64 LE timestamp (valid suffix only)
///   meta           utf8 key bytes      → bincode values
pub struct StateDb {
    _db: sled::Db,
    admissions: sled::Tree,
    participants: sled::Tree,
    activity: sled::Tree,
    consumed_refs: sled::Tree,
    velocity: sled::Tree,
    meta: sled::Tree,
}

impl StateDb {
    /// Open or create the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ForgeError> {
        let db = sled::open(path).map_err(storage)?;
        let admissions    = db.open_tree("admissions").map_err(storage)?;
        let participants  = db.open_tree("participants").map_err(storage)?;
        let activity      = db.open_tree("activity").map_err(storage)?;
        let consumed_refs = db.open_tree("consumed_refs").map_err(storage)?;
        let velocity      = db.open_tree("velocity").map_err(storage)?;
        let meta          = db.open_tree("meta").map_err(storage)?;
        Ok(Self { _db: db, admissions, participants, activity, consumed_refs, velocity, meta })
    }

    // ── Admissions ───────────────────────────────────────────────────────────

    pub fn get_admission(&self, id: &AdmissionId) -> Result<Option<AdmissionRecord>, ForgeError> {
        match self.admissions.get(id.as_bytes()).map_err(storage)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_admission(&self, record: &AdmissionRecord) -> Result<(), ForgeError> {
        self.admissions
            .insert(record.id.as_bytes(), encode(record)?)
            .map_err(storage)?;
        Ok(())
    }

    pub fn admission_exists(&self, id: &AdmissionId) -> Result<bool, ForgeError> {
        self.admissions.contains_key(id.as_bytes()).map_err(storage)
    }

    // ── Participants ─────────────────────────────────────────────────────────

    pub fn put_participant(&self, status: &ParticipantStatus) -> Result<(), ForgeError> {
        self.participants
            .insert(status.participant.as_bytes(), encode(status)?)
            .map_err(storage)?;
        Ok(())
    }

    pub fn get_participant(&self, id: &ParticipantId) -> Result<Option<ParticipantStatus>, ForgeError> {
        match self.participants.get(id.as_bytes()).map_err(storage)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn iter_participants(&self) -> Result<Vec<ParticipantStatus>, ForgeError> {
        let mut out = Vec::new();
        for item in self.participants.iter() {
            let (_, bytes) = item.map_err(storage)?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    // ── Activity ─────────────────────────────────────────────────────────────

    pub fn put_activity(&self, activity: &ParticipantActivity) -> Result<(), ForgeError> {
        self.activity
            .insert(activity.participant.as_bytes(), encode(activity)?)
            .map_err(storage)?;
        Ok(())
    }

    pub fn iter_activity(&self) -> Result<Vec<ParticipantActivity>, ForgeError> {
        let mut out = Vec::new();
        for item in self.activity.iter() {
            let (_, bytes) = item.map_err(storage)?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    // ── Consumed payment references ──────────────────────────────────────────

    /// The verified admission that consumed `payment_ref`, if any.
    pub fn consumed_by(&self, payment_ref: &PaymentRef) -> Result<Option<AdmissionId>, ForgeError> {
        match self.consumed_refs.get(payment_ref.as_bytes()).map_err(storage)? {
            Some(bytes) => Ok(Some(AdmissionId::from_bytes(key_32(&bytes)?))),
            None => Ok(None),
        }
    }

    pub fn consume_ref(&self, payment_ref: &PaymentRef, by: &AdmissionId) -> Result<(), ForgeError> {
        self.consumed_refs
            .insert(payment_ref.as_bytes(), by.as_bytes().as_ref())
            .map_err(storage)?;
        Ok(())
    }

    // ── Velocity log ─────────────────────────────────────────────────────────

    pub fn put_velocity_entry(&self, index: u64, at: Timestamp) -> Result<(), ForgeError> {
        self.velocity
            .insert(index.to_be_bytes(), at.to_le_bytes().as_ref())
            .map_err(storage)?;
        Ok(())
    }

    /// Stored entries in index order.
    pub fn velocity_entries(&self) -> Result<Vec<(u64, Timestamp)>, ForgeError> {
        let mut out = Vec::new();
        for item in self.velocity.iter() {
            let (key, value) = item.map_err(storage)?;
            let index = <[u8; 8]>::try_from(key.as_ref())
                .map(u64::from_be_bytes)
                .map_err(|_| ForgeError::Storage("malformed velocity index".into()))?;
            let at = <[u8; 8]>::try_from(value.as_ref())
                .map(i64::from_le_bytes)
                .map_err(|_| ForgeError::Storage("malformed velocity timestamp".into()))?;
            out.push((index, at));
        }
        Ok(out)
    }

    /// Drop every stored entry below `cursor`. Returns how many were removed.
    pub fn prune_velocity_below(&self, cursor: u64) -> Result<usize, ForgeError> {
        let mut batch = sled::Batch::default();
        let mut removed = 0;
        for item in self.velocity.range(..cursor.to_be_bytes()) {
            let (key, _) = item.map_err(storage)?;
            batch.remove(key);
            removed += 1;
        }
        self.velocity.apply_batch(batch).map_err(storage)?;
        Ok(removed)
    }

    // ── Meta ─────────────────────────────────────────────────────────────────

    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), ForgeError> {
        self.meta.insert(key.as_bytes(), value).map_err(storage)?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, ForgeError> {
        self.meta
            .get(key.as_bytes())
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(storage)
    }

    pub fn put_meta_value<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ForgeError> {
        self.put_meta(key, &encode(value)?)
    }

    pub fn get_meta_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ForgeError> {
        match self.get_meta(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), ForgeError> {
        self._db.flush().map_err(storage)?;
        Ok(())
    }
}
