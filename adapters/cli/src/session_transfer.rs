#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use geocoin_core::{CacheMemento, Command, HoldingMemento, MementoError};
use geocoin_world::{memento, query, World};
use serde::{Deserialize, Serialize};

const SESSION_DOMAIN: &str = "geocoin";
const SESSION_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded session payload.
pub(crate) const SESSION_HEADER: &str = "geocoin:v1";
/// Delimiter used to separate the prefix, cache count and payload.
const FIELD_DELIMITER: char = ':';

/// Every cache memento of a session plus the coins the player carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct SessionSnapshot {
    /// Mementos of every cache ever materialized, in cell order.
    pub(crate) caches: Vec<CacheMemento>,
    /// Memento of the player's holding.
    pub(crate) holding: HoldingMemento,
}

impl SessionSnapshot {
    /// Captures the current state of `world`.
    #[must_use]
    pub(crate) fn capture(world: &World) -> Self {
        Self {
            caches: query::cache_mementos(world).into_values().collect(),
            holding: query::holding_memento(world),
        }
    }

    /// Encodes the snapshot into a single-line string suitable for a save file.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("session snapshot serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!("{SESSION_HEADER}:{}:{encoded}", self.caches.len())
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, SessionTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SessionTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(SessionTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(SessionTransferError::MissingVersion)?;
        let count = parts.next().ok_or(SessionTransferError::MissingCount)?;
        let payload = parts.next().ok_or(SessionTransferError::MissingPayload)?;

        if domain != SESSION_DOMAIN {
            return Err(SessionTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SESSION_VERSION {
            return Err(SessionTransferError::UnsupportedVersion(version.to_owned()));
        }

        let declared = count
            .trim()
            .parse::<usize>()
            .map_err(|_| SessionTransferError::InvalidCount(count.to_owned()))?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(SessionTransferError::InvalidEncoding)?;
        let decoded: Self =
            serde_json::from_slice(&bytes).map_err(SessionTransferError::InvalidPayload)?;

        if decoded.caches.len() != declared {
            return Err(SessionTransferError::CountMismatch {
                declared,
                found: decoded.caches.len(),
            });
        }
        Ok(decoded)
    }

    /// Converts the snapshot into the commands that rebuild it inside a world.
    ///
    /// Every cache memento is checked up front so a corrupt save is refused
    /// before any command reaches the world.
    pub(crate) fn into_commands(self) -> Result<Vec<Command>, SessionTransferError> {
        let mut commands = Vec::with_capacity(self.caches.len() + 1);
        for (index, cache_memento) in self.caches.into_iter().enumerate() {
            let cache = memento::restore(&cache_memento)
                .map_err(|reason| SessionTransferError::CorruptCache { index, reason })?;
            commands.push(Command::RestoreCache {
                cell: cache.cell(),
                memento: cache_memento,
            });
        }
        commands.push(Command::RestoreHolding {
            memento: self.holding,
        });
        Ok(commands)
    }
}

/// Errors that can occur while decoding session transfer strings.
#[derive(Debug)]
pub(crate) enum SessionTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded session.
    MissingPrefix,
    /// The encoded session did not contain a version segment.
    MissingVersion,
    /// The encoded session did not include the cache count.
    MissingCount,
    /// The encoded session did not include the payload segment.
    MissingPayload,
    /// The encoded session used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded session used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The cache count could not be parsed.
    InvalidCount(String),
    /// The payload held a different number of caches than the header declared.
    CountMismatch {
        /// Count written in the header.
        declared: usize,
        /// Count found in the payload.
        found: usize,
    },
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
    /// One of the cache mementos inside the payload is corrupt.
    CorruptCache {
        /// Position of the memento within the payload.
        index: usize,
        /// Why the memento was refused.
        reason: MementoError,
    },
}

impl fmt::Display for SessionTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "session file was empty"),
            Self::MissingPrefix => write!(f, "session string is missing the prefix"),
            Self::MissingVersion => write!(f, "session string is missing the version"),
            Self::MissingCount => write!(f, "session string is missing the cache count"),
            Self::MissingPayload => write!(f, "session string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "session prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "session version '{version}' is not supported")
            }
            Self::InvalidCount(count) => write!(f, "could not parse cache count '{count}'"),
            Self::CountMismatch { declared, found } => {
                write!(f, "session declares {declared} caches but contains {found}")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode session payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse session payload: {error}")
            }
            Self::CorruptCache { index, reason } => {
                write!(f, "cache memento #{index} is corrupt: {reason}")
            }
        }
    }
}

impl Error for SessionTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            Self::CorruptCache { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
