//! In-process gateway that simulates a backend.
//!
//! Every call waits a fixed latency, then answers from an in-memory copy of
//! the fixture data so later fetches in the same process observe earlier
//! writes. Faults can be injected to exercise rollback paths.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{
    AuthGateway, DownloadsGateway, Envelope, FriendsGateway, GatewayError, GatewayResult,
    LibraryGateway, NotificationsGateway, PostsGateway, ProfileGateway,
};
use crate::models::{
    Download, DownloadStatus, Friend, HistoryEntry, MediaId, MediaItem, Notification,
    NotificationId, Post, PostId, Profile, ProfilePatch, Session, UserId, UserSummary,
};
use crate::util::unix_millis_now;

/// Latency applied to every mock call unless configured otherwise
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(400);

const SESSION_TTL_MILLIS: i64 = 60 * 60 * 1000;
const MIN_PASSWORD_CHARS: usize = 8;

/// A failure to inject into upcoming calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The call errors at the transport level
    Reject(String),
    /// The call answers with `success: false`
    Envelope(String),
    Offline,
}

#[derive(Debug, Default)]
struct Faults {
    queued: VecDeque<Fault>,
    always: Option<Fault>,
}

#[derive(Debug)]
struct ServerState {
    friends: Vec<Friend>,
    directory: Vec<Friend>,
    posts: Vec<Post>,
    notifications: Vec<Notification>,
    profiles: Vec<Profile>,
    catalog: Vec<MediaItem>,
    history: Vec<HistoryEntry>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            friends: fixtures::friends(),
            directory: fixtures::directory(),
            posts: fixtures::feed(),
            notifications: fixtures::notifications(),
            profiles: fixtures::profiles(),
            catalog: fixtures::catalog(),
            history: fixtures::history(),
        }
    }
}

/// Mock implementation of every gateway trait.
///
/// Clones share the same server state and fault queue.
#[derive(Debug, Clone)]
pub struct MockBackend {
    latency: Duration,
    state: Arc<Mutex<ServerState>>,
    faults: Arc<Mutex<Faults>>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

impl MockBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            state: Arc::new(Mutex::new(ServerState::default())),
            faults: Arc::new(Mutex::new(Faults::default())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub const fn latency(&self) -> Duration {
        self.latency
    }

    /// Fail the next call with `fault`. Queued faults apply in order.
    pub fn fail_next(&self, fault: Fault) {
        self.lock_faults().queued.push_back(fault);
    }

    /// Fail every call until [`Self::heal`] is called.
    pub fn fail_always(&self, fault: Fault) {
        self.lock_faults().always = Some(fault);
    }

    /// Drop every injected fault.
    pub fn heal(&self) {
        let mut faults = self.lock_faults();
        faults.queued.clear();
        faults.always = None;
    }

    /// Number of calls answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_fault(&self) -> Option<Fault> {
        let mut faults = self.lock_faults();
        faults
            .queued
            .pop_front()
            .or_else(|| faults.always.clone())
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        handler: impl FnOnce(&mut ServerState) -> Envelope<T>,
    ) -> GatewayResult<T> {
        tokio::time::sleep(self.latency).await;
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(fault) = self.take_fault() {
            tracing::debug!(operation, ?fault, "Mock gateway injecting fault");
            return match fault {
                Fault::Reject(message) => Err(GatewayError::Rejected(message)),
                Fault::Envelope(message) => Ok(Envelope::failure(message)),
                Fault::Offline => Err(GatewayError::Offline),
            };
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let envelope = handler(&mut state);
        tracing::debug!(operation, success = envelope.success, "Mock gateway answered");
        Ok(envelope)
    }
}

fn find_mut<'a, T, F>(items: &'a mut [T], matches: F) -> Option<&'a mut T>
where
    F: Fn(&T) -> bool,
{
    items.iter_mut().find(|item| matches(item))
}

impl AuthGateway for MockBackend {
    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<Session> {
        let email = email.trim().to_lowercase();
        let password_ok = password.chars().count() >= MIN_PASSWORD_CHARS;
        self.call("sign_in", move |state| {
            let Some((local, _)) = email.split_once('@').filter(|_| password_ok) else {
                return Envelope::failure("Invalid email or password");
            };
            let user = state
                .profiles
                .iter()
                .find(|profile| profile.handle == local)
                .map_or_else(
                    || UserSummary::new(local, local, local),
                    |profile| UserSummary {
                        id: profile.id.clone(),
                        display_name: profile.display_name.clone(),
                        handle: profile.handle.clone(),
                    },
                );
            Envelope::ok(Session {
                user,
                token: uuid::Uuid::now_v7().to_string(),
                expires_at: unix_millis_now() + SESSION_TTL_MILLIS,
            })
        })
        .await
    }

    async fn sign_out(&self, _token: &str) -> GatewayResult<()> {
        self.call("sign_out", |_| Envelope::ok_empty()).await
    }
}

impl FriendsGateway for MockBackend {
    async fn list_friends(&self) -> GatewayResult<Vec<Friend>> {
        self.call("list_friends", |state| Envelope::ok(state.friends.clone()))
            .await
    }

    async fn add_friend(&self, id: &UserId) -> GatewayResult<Friend> {
        self.call("add_friend", |state| {
            if state.friends.iter().any(|friend| &friend.id == id) {
                return Envelope::failure(format!("{id} is already your friend"));
            }
            let Some(index) = state.directory.iter().position(|user| &user.id == id) else {
                return Envelope::failure(format!("No user with id {id}"));
            };
            let mut friend = state.directory.remove(index);
            friend.since = unix_millis_now();
            state.friends.insert(0, friend.clone());
            Envelope::ok(friend)
        })
        .await
    }

    async fn remove_friend(&self, id: &UserId) -> GatewayResult<()> {
        self.call("remove_friend", |state| {
            let Some(index) = state.friends.iter().position(|friend| &friend.id == id) else {
                return Envelope::failure(format!("{id} is not your friend"));
            };
            let friend = state.friends.remove(index);
            state.directory.push(friend);
            Envelope::ok_empty()
        })
        .await
    }

    async fn set_favorite(&self, id: &UserId, favorite: bool) -> GatewayResult<()> {
        self.call("set_favorite", |state| {
            find_mut(&mut state.friends, |friend| &friend.id == id).map_or_else(
                || Envelope::failure(format!("{id} is not your friend")),
                |friend| {
                    friend.favorite = favorite;
                    Envelope::ok_empty()
                },
            )
        })
        .await
    }
}

impl PostsGateway for MockBackend {
    async fn list_feed(&self) -> GatewayResult<Vec<Post>> {
        self.call("list_feed", |state| Envelope::ok(state.posts.clone()))
            .await
    }

    async fn create_post(&self, post: &Post) -> GatewayResult<Post> {
        let post = post.clone();
        self.call("create_post", move |state| {
            if state.posts.iter().any(|existing| existing.id == post.id) {
                return Envelope::failure("Post already exists");
            }
            let canonical = Post {
                content: post.content.trim().to_string(),
                created_at: unix_millis_now(),
                ..post
            };
            state.posts.insert(0, canonical.clone());
            Envelope::ok(canonical)
        })
        .await
    }

    async fn set_like(&self, id: &PostId, liked: bool) -> GatewayResult<()> {
        self.call("set_like", |state| {
            find_mut(&mut state.posts, |post| &post.id == id).map_or_else(
                || Envelope::failure("Post not found"),
                |post| {
                    if post.liked != liked {
                        *post = post.toggled_like();
                    }
                    Envelope::ok_empty()
                },
            )
        })
        .await
    }

    async fn add_comment(&self, id: &PostId, _text: &str) -> GatewayResult<()> {
        self.call("add_comment", |state| {
            find_mut(&mut state.posts, |post| &post.id == id).map_or_else(
                || Envelope::failure("Post not found"),
                |post| {
                    post.comments = post.comments.saturating_add(1);
                    Envelope::ok_empty()
                },
            )
        })
        .await
    }

    async fn delete_post(&self, id: &PostId) -> GatewayResult<()> {
        self.call("delete_post", |state| {
            let before = state.posts.len();
            state.posts.retain(|post| &post.id != id);
            if state.posts.len() == before {
                Envelope::failure("Post not found")
            } else {
                Envelope::ok_empty()
            }
        })
        .await
    }
}

impl NotificationsGateway for MockBackend {
    async fn list_notifications(&self) -> GatewayResult<Vec<Notification>> {
        self.call("list_notifications", |state| {
            Envelope::ok(state.notifications.clone())
        })
        .await
    }

    async fn mark_read(&self, ids: &[NotificationId]) -> GatewayResult<()> {
        self.call("mark_read", |state| {
            for notification in &mut state.notifications {
                if ids.contains(&notification.id) {
                    notification.unread = false;
                }
            }
            Envelope::ok_empty()
        })
        .await
    }

    async fn dismiss(&self, id: &NotificationId) -> GatewayResult<()> {
        self.call("dismiss", |state| {
            state
                .notifications
                .retain(|notification| &notification.id != id);
            Envelope::ok_empty()
        })
        .await
    }
}

impl ProfileGateway for MockBackend {
    async fn get_profile(&self, id: &UserId) -> GatewayResult<Profile> {
        self.call("get_profile", |state| {
            if let Some(profile) = state.profiles.iter().find(|profile| &profile.id == id) {
                return Envelope::ok(profile.clone());
            }
            let profile = fixtures::blank_profile(id);
            state.profiles.push(profile.clone());
            Envelope::ok(profile)
        })
        .await
    }

    async fn update_profile(&self, id: &UserId, patch: &ProfilePatch) -> GatewayResult<Profile> {
        self.call("update_profile", |state| {
            find_mut(&mut state.profiles, |profile| &profile.id == id).map_or_else(
                || Envelope::failure("Profile not found"),
                |profile| {
                    *profile = profile.patched(patch);
                    Envelope::ok(profile.clone())
                },
            )
        })
        .await
    }

    async fn set_follow(&self, id: &UserId, follow: bool) -> GatewayResult<()> {
        self.call("set_follow", |state| {
            find_mut(&mut state.profiles, |profile| &profile.id == id).map_or_else(
                || Envelope::failure("Profile not found"),
                |profile| {
                    if profile.followed_by_me != follow {
                        *profile = profile.toggled_follow();
                    }
                    Envelope::ok_empty()
                },
            )
        })
        .await
    }
}

impl LibraryGateway for MockBackend {
    async fn list_catalog(&self) -> GatewayResult<Vec<MediaItem>> {
        self.call("list_catalog", |state| Envelope::ok(state.catalog.clone()))
            .await
    }

    async fn list_history(&self) -> GatewayResult<Vec<HistoryEntry>> {
        self.call("list_history", |state| Envelope::ok(state.history.clone()))
            .await
    }

    async fn set_in_my_list(&self, id: &MediaId, in_list: bool) -> GatewayResult<()> {
        self.call("set_in_my_list", |state| {
            find_mut(&mut state.catalog, |item| &item.id == id).map_or_else(
                || Envelope::failure("Title not found"),
                |item| {
                    item.in_my_list = in_list;
                    Envelope::ok_empty()
                },
            )
        })
        .await
    }

    async fn record_watch(&self, entry: &HistoryEntry) -> GatewayResult<()> {
        let entry = entry.clone();
        self.call("record_watch", move |state| {
            state.history.push(entry);
            Envelope::ok_empty()
        })
        .await
    }

    async fn clear_history(&self) -> GatewayResult<()> {
        self.call("clear_history", |state| {
            state.history.clear();
            Envelope::ok_empty()
        })
        .await
    }
}

impl DownloadsGateway for MockBackend {
    async fn request_download(&self, id: &MediaId) -> GatewayResult<Download> {
        self.call("request_download", |state| {
            state.catalog.iter().find(|item| &item.id == id).map_or_else(
                || Envelope::failure("Title not found"),
                |item| {
                    Envelope::ok(Download {
                        status: DownloadStatus::Completed,
                        ..Download::pending(item)
                    })
                },
            )
        })
        .await
    }

    async fn cancel_download(&self, _id: &MediaId) -> GatewayResult<()> {
        self.call("cancel_download", |_| Envelope::ok_empty()).await
    }
}

/// Canned records served by [`MockBackend`].
pub mod fixtures {
    use crate::models::{
        Friend, HistoryEntry, HistoryEntryId, MediaId, MediaItem, MediaKind, Notification,
        NotificationKind, Post, PostId, Profile, UserId, UserSummary,
    };

    /// Reference time for fixture timestamps (Unix ms)
    pub const EPOCH_MS: i64 = 1_760_000_000_000;
    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn friend(id: &str, name: &str, online: bool, favorite: bool, days: i64) -> Friend {
        Friend {
            id: UserId::from(id),
            display_name: name.to_string(),
            handle: id.to_string(),
            online,
            favorite,
            since: EPOCH_MS - days * 24 * HOUR_MS,
        }
    }

    pub fn friends() -> Vec<Friend> {
        vec![
            friend("grace", "Grace Hopper", true, true, 40),
            friend("alan", "Alan Turing", false, false, 120),
            friend("katherine", "Katherine Johnson", true, false, 300),
        ]
    }

    /// Users that are not yet friends
    pub fn directory() -> Vec<Friend> {
        vec![
            friend("linus", "Linus Torvalds", true, false, 0),
            friend("margaret", "Margaret Hamilton", false, false, 0),
            friend("dennis", "Dennis Ritchie", false, false, 0),
        ]
    }

    fn post(
        id: &str,
        author: &str,
        content: &str,
        hours_ago: i64,
        likes: u32,
        liked: bool,
    ) -> Post {
        Post {
            id: PostId::from(id),
            author: UserSummary::new(author, author, author),
            content: content.to_string(),
            created_at: EPOCH_MS - hours_ago * HOUR_MS,
            liked,
            likes,
            comments: likes / 3,
        }
    }

    pub fn feed() -> Vec<Post> {
        vec![
            post("p1", "grace", "Found a moth in the relay again #debugging", 1, 10, false),
            post("p2", "alan", "Can machines think? Discuss. #ai", 5, 42, true),
            post("p3", "katherine", "Trajectories checked by hand #space #math", 26, 7, false),
        ]
    }

    fn notification(
        id: &str,
        kind: NotificationKind,
        title: &str,
        body: &str,
        unread: bool,
        hours_ago: i64,
    ) -> Notification {
        Notification {
            id: id.into(),
            kind,
            title: title.to_string(),
            body: body.to_string(),
            unread,
            created_at: EPOCH_MS - hours_ago * HOUR_MS,
        }
    }

    pub fn notifications() -> Vec<Notification> {
        vec![
            notification(
                "n1",
                NotificationKind::Like,
                "Grace liked your post",
                "Relays are fun",
                true,
                1,
            ),
            notification(
                "n2",
                NotificationKind::FriendRequest,
                "Linus sent a friend request",
                "Say hi",
                true,
                3,
            ),
            notification(
                "n3",
                NotificationKind::Comment,
                "Alan commented",
                "Interesting point",
                false,
                8,
            ),
            notification(
                "n4",
                NotificationKind::System,
                "Welcome to Plaza",
                "Set up your profile",
                false,
                48,
            ),
        ]
    }

    pub fn profiles() -> Vec<Profile> {
        vec![
            Profile {
                id: UserId::from("ada"),
                display_name: "Ada Lovelace".to_string(),
                handle: "ada".to_string(),
                bio: "Poetical science".to_string(),
                avatar_url: None,
                followers: 128,
                following: 12,
                followed_by_me: false,
            },
            Profile {
                id: UserId::from("grace"),
                display_name: "Grace Hopper".to_string(),
                handle: "grace".to_string(),
                bio: "It's easier to ask forgiveness".to_string(),
                avatar_url: None,
                followers: 900,
                following: 40,
                followed_by_me: true,
            },
        ]
    }

    pub fn blank_profile(id: &UserId) -> Profile {
        Profile {
            id: id.clone(),
            display_name: id.to_string(),
            handle: id.to_string(),
            bio: String::new(),
            avatar_url: None,
            followers: 0,
            following: 0,
            followed_by_me: false,
        }
    }

    fn media(id: &str, title: &str, kind: MediaKind, minutes: u32, in_my_list: bool) -> MediaItem {
        MediaItem {
            id: MediaId::from(id),
            title: title.to_string(),
            kind,
            duration_secs: minutes * 60,
            size_bytes: u64::from(minutes) * 12 * 1024 * 1024,
            in_my_list,
        }
    }

    pub fn catalog() -> Vec<MediaItem> {
        vec![
            media("m1", "The Difference Engine", MediaKind::Movie, 112, true),
            media("m2", "Bletchley Nights", MediaKind::Series, 48, false),
            media("m3", "Apollo Guidance", MediaKind::Clip, 6, false),
            media("m4", "Compilers After Dark", MediaKind::Podcast, 55, true),
        ]
    }

    pub fn history() -> Vec<HistoryEntry> {
        vec![HistoryEntry {
            id: HistoryEntryId::from("h1"),
            media_id: MediaId::from("m2"),
            title: "Bletchley Nights".to_string(),
            watched_at: EPOCH_MS - 30 * HOUR_MS,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MockBackend {
        MockBackend::new(Duration::ZERO)
    }

    #[tokio::test]
    async fn answers_from_fixtures() {
        let backend = backend();
        let feed = backend.list_feed().await.unwrap();
        assert!(feed.success);
        assert_eq!(feed.data.unwrap().len(), fixtures::feed().len());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn writes_are_visible_to_later_reads() {
        let backend = backend();
        backend.add_friend(&UserId::from("linus")).await.unwrap();
        let friends = backend.list_friends().await.unwrap().data.unwrap();
        assert_eq!(friends[0].id, UserId::from("linus"));
    }

    #[tokio::test]
    async fn queued_faults_apply_in_order_then_clear() {
        let backend = backend();
        backend.fail_next(Fault::Offline);
        backend.fail_next(Fault::Envelope("maintenance".to_string()));

        assert_eq!(backend.list_feed().await.unwrap_err(), GatewayError::Offline);
        let envelope = backend.list_feed().await.unwrap();
        assert!(!envelope.success);
        assert!(backend.list_feed().await.unwrap().success);
    }

    #[tokio::test]
    async fn fail_always_until_healed() {
        let backend = backend();
        backend.fail_always(Fault::Reject("down".to_string()));
        assert!(backend.list_catalog().await.is_err());
        assert!(backend.list_catalog().await.is_err());
        backend.heal();
        assert!(backend.list_catalog().await.is_ok());
    }

    #[tokio::test]
    async fn sign_in_rejects_short_password() {
        let backend = backend();
        let envelope = backend.sign_in("ada@example.com", "short").await.unwrap();
        assert!(!envelope.success);

        let session = backend
            .sign_in("ada@example.com", "correct horse")
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(session.user.display_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn faulted_call_does_not_touch_server_state() {
        let backend = backend();
        backend.fail_next(Fault::Offline);
        let _ = backend.delete_post(&PostId::from("p1")).await;
        assert_eq!(backend.list_feed().await.unwrap().data.unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_wait_for_latency() {
        let backend = MockBackend::new(Duration::from_millis(250));
        let started = tokio::time::Instant::now();
        backend.list_friends().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
