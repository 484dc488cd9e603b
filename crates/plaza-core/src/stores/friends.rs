//! Friends list with favorites.

use std::str::FromStr;

use super::StoreOptions;
use crate::gateway::FriendsGateway;
use crate::models::{Friend, UserId};
use crate::sync::{InsertionPolicy, SyncedCollection};
use crate::{Error, Result};

const LOAD_FAILED: &str = "Couldn't load friends";
const ADD_FAILED: &str = "Couldn't add friend";
const REMOVE_FAILED: &str = "Couldn't remove friend";
const FAVORITE_FAILED: &str = "Couldn't update favorite";

pub struct FriendsStore<G> {
    gateway: G,
    friends: SyncedCollection<Friend>,
}

impl<G: FriendsGateway> FriendsStore<G> {
    pub fn new(gateway: G, options: &StoreOptions) -> Self {
        Self {
            gateway,
            friends: options.collection("friends", InsertionPolicy::Prepend),
        }
    }

    pub const fn collection(&self) -> &SyncedCollection<Friend> {
        &self.friends
    }

    pub async fn refresh(&self) -> Result<usize> {
        self.friends
            .load(self.gateway.list_friends(), LOAD_FAILED)
            .await
    }

    /// Add a friend by user id; a placeholder shows until the server returns
    /// the full record.
    pub async fn add_friend(&self, id: &str) -> Result<Friend> {
        let id = UserId::from_str(id.trim()).map_err(|e| self.friends.reject(ADD_FAILED, e))?;
        if self.friends.contains(&id) {
            return Err(self.friends.reject(
                ADD_FAILED,
                Error::Validation(format!("{id} is already your friend")),
            ));
        }

        let pending = self
            .friends
            .begin_insert(Friend::pending(id.clone()))
            .await
            .map_err(|e| self.friends.reject(ADD_FAILED, e))?;
        let response = self.gateway.add_friend(&id).await;
        let friend = pending.settle_with(response, ADD_FAILED, |data| {
            data.cloned()
                .map(Some)
                .ok_or_else(|| "server did not return the new friend".to_string())
        })?;
        friend.ok_or_else(|| Error::Unexpected("server did not return the new friend".to_string()))
    }

    pub async fn remove_friend(&self, id: &UserId) -> Result<()> {
        let pending = self
            .friends
            .begin_remove(id)
            .await
            .map_err(|e| self.friends.reject(REMOVE_FAILED, e))?;
        let response = self.gateway.remove_friend(id).await;
        pending.settle(response, REMOVE_FAILED)?;
        Ok(())
    }

    /// Flip the favorite flag and return the new value.
    pub async fn toggle_favorite(&self, id: &UserId) -> Result<bool> {
        let mut favorite = false;
        let pending = self
            .friends
            .begin_update(id, |friend| {
                favorite = !friend.favorite;
                Friend {
                    favorite,
                    ..friend.clone()
                }
            })
            .await
            .map_err(|e| self.friends.reject(FAVORITE_FAILED, e))?;
        let response = self.gateway.set_favorite(id, favorite).await;
        pending.settle(response, FAVORITE_FAILED)?;
        Ok(favorite)
    }

    pub fn online(&self) -> Vec<Friend> {
        self.friends.view(|friends| {
            friends
                .iter()
                .filter(|friend| friend.online)
                .cloned()
                .collect()
        })
    }

    pub fn favorites(&self) -> Vec<Friend> {
        self.friends.view(|friends| {
            friends
                .iter()
                .filter(|friend| friend.favorite)
                .cloned()
                .collect()
        })
    }

    pub fn count(&self) -> usize {
        self.friends.len()
    }
}
