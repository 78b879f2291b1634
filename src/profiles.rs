//! User profiles — a derived cache of external Farcaster identities.
//!
//! Profiles are created lazily on first reference and refreshed through a
//! TTL-bound cache in front of the identity provider. The stored row is a
//! fallback when the provider is unreachable, never the source of truth.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::ledger::Ledger;
use crate::providers::IdentityProvider;
use crate::types::{Fid, MarketError, UserProfile};

pub struct ProfileService {
    ledger: Arc<Ledger>,
    identity: Arc<dyn IdentityProvider>,
    cache: TtlCache<Fid, UserProfile>,
}

impl ProfileService {
    pub fn new(ledger: Arc<Ledger>, identity: Arc<dyn IdentityProvider>, ttl: Duration) -> Self {
        Self {
            ledger,
            identity,
            cache: TtlCache::new(ttl),
        }
    }

    /// Fetch a profile: cache, then provider (persisting the refresh),
    /// then the stored row as a stale fallback if the provider is down.
    pub async fn get_or_fetch(&self, fid: Fid) -> Result<UserProfile, MarketError> {
        if let Some(profile) = self.cache.get(&fid).await {
            return Ok(profile);
        }

        match self.identity.lookup(fid).await {
            Ok(snapshot) => {
                let now = Utc::now();
                let created_at = self
                    .ledger
                    .profile(fid)
                    .await?
                    .map(|p| p.created_at)
                    .unwrap_or(now);
                let profile = UserProfile {
                    fid: snapshot.fid,
                    username: snapshot.username,
                    display_name: snapshot.display_name,
                    pfp_url: snapshot.pfp_url,
                    wallet: snapshot.wallet,
                    followers_count: snapshot.followers_count,
                    following_count: snapshot.following_count,
                    created_at,
                    updated_at: now,
                };
                self.ledger.upsert_profile(&profile).await?;
                self.cache.insert(fid, profile.clone()).await;
                debug!(fid, "Profile refreshed");
                Ok(profile)
            }
            Err(MarketError::UserNotFound(fid)) => Err(MarketError::UserNotFound(fid)),
            Err(e) => match self.ledger.profile(fid).await? {
                Some(stale) => {
                    warn!(fid, error = %e, "Identity provider unreachable, serving stored profile");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
