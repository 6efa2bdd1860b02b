//! In-memory source of record
//!
//! Holds users, posts, comments, likes and follows behind one lock so
//! cascading deletes stay atomic. Data is lost when the process terminates.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::comment::{Comment, CommentFilter, CommentId, CommentRepository, NewComment};
use crate::domain::engagement::{
    validate_follow, FollowCounts, FollowRepository, FollowToggle, LikeRepository, LikeTarget,
    LikeToggle,
};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::post::{NewPost, Post, PostId, PostRepository, PostScope};
use crate::domain::principal::Principal;
use crate::domain::user::{NewUser, User, UserId, UserRepository};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct SocialData {
    last_user: u64,
    last_post: u64,
    last_comment: u64,
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    likes: BTreeSet<(UserId, LikeKey)>,
    /// (follower, followee)
    follows: BTreeSet<(UserId, UserId)>,
}

/// Orderable form of a like target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LikeKey {
    Post(PostId),
    Comment(CommentId),
}

impl From<LikeTarget> for LikeKey {
    fn from(target: LikeTarget) -> Self {
        match target {
            LikeTarget::Post(id) => Self::Post(id),
            LikeTarget::Comment(id) => Self::Comment(id),
        }
    }
}

impl SocialData {
    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.username() == username && Some(u.id()) != except)
    }

    fn require_user(&self, id: UserId) -> Result<&User, DomainError> {
        self.users
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("User {} not found", id)))
    }

    fn require_post(&self, id: PostId) -> Result<&Post, DomainError> {
        self.posts
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("Post {} not found", id)))
    }

    fn require_target(&self, target: LikeTarget) -> Result<(), DomainError> {
        match target {
            LikeTarget::Post(id) => self.require_post(id).map(|_| ()),
            LikeTarget::Comment(id) => self
                .comments
                .get(&id)
                .map(|_| ())
                .ok_or_else(|| DomainError::not_found(format!("Comment {} not found", id))),
        }
    }

    fn like_count(&self, target: LikeKey) -> usize {
        self.likes.iter().filter(|(_, t)| *t == target).count()
    }

    fn following(&self, user: UserId) -> BTreeSet<UserId> {
        self.follows
            .iter()
            .filter(|(follower, _)| *follower == user)
            .map(|(_, followee)| *followee)
            .collect()
    }

    fn counts(&self, user: UserId) -> FollowCounts {
        FollowCounts {
            user,
            followers: self.follows.iter().filter(|(_, f)| *f == user).count(),
            following: self.follows.iter().filter(|(f, _)| *f == user).count(),
        }
    }

    fn remove_comment(&mut self, id: CommentId) -> bool {
        let removed = self.comments.remove(&id).is_some();
        if removed {
            self.likes.retain(|(_, target)| *target != LikeKey::Comment(id));
        }
        removed
    }

    fn remove_post(&mut self, id: PostId) -> bool {
        if self.posts.remove(&id).is_none() {
            return false;
        }

        let comments: Vec<CommentId> = self
            .comments
            .values()
            .filter(|c| c.post() == id)
            .map(|c| c.id())
            .collect();
        for comment in comments {
            self.remove_comment(comment);
        }

        self.likes.retain(|(_, target)| *target != LikeKey::Post(id));
        true
    }
}

#[derive(Debug, Default)]
pub struct InMemorySocialStore {
    data: RwLock<SocialData>,
}

impl InMemorySocialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SocialData>, DomainError> {
        self.data
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SocialData>, DomainError> {
        self.data
            .write()
            .map_err(|e| DomainError::storage(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl UserRepository for InMemorySocialStore {
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username() == username)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut data = self.write()?;

        if data.username_taken(&user.username, None) {
            return Err(DomainError::conflict(format!(
                "A user with username '{}' already exists",
                user.username
            )));
        }

        data.last_user += 1;
        let user = User::from_new(UserId::new(data.last_user), user);
        data.users.insert(user.id(), user.clone());

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut data = self.write()?;

        data.require_user(user.id())?;
        if data.username_taken(user.username(), Some(user.id())) {
            return Err(DomainError::conflict(format!(
                "A user with username '{}' already exists",
                user.username()
            )));
        }

        data.users.insert(user.id(), user.clone());
        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let mut data = self.write()?;

        if data.users.remove(&id).is_none() {
            return Ok(false);
        }

        let posts: Vec<PostId> = data
            .posts
            .values()
            .filter(|p| p.author() == id)
            .map(|p| p.id())
            .collect();
        for post in posts {
            data.remove_post(post);
        }

        let comments: Vec<CommentId> = data
            .comments
            .values()
            .filter(|c| c.author() == id)
            .map(|c| c.id())
            .collect();
        for comment in comments {
            data.remove_comment(comment);
        }

        data.likes.retain(|(user, _)| *user != id);
        data.follows
            .retain(|(follower, followee)| *follower != id && *followee != id);

        Ok(true)
    }

    async fn list(&self, page: PageRequest) -> Result<Page<User>, DomainError> {
        let users: Vec<User> = self.read()?.users.values().cloned().collect();
        Page::slice(users, page)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.users.len())
    }
}

#[async_trait]
impl PostRepository for InMemorySocialStore {
    async fn get(&self, id: PostId) -> Result<Option<Post>, DomainError> {
        Ok(self.read()?.posts.get(&id).cloned())
    }

    async fn create(&self, post: NewPost) -> Result<Post, DomainError> {
        let mut data = self.write()?;

        data.require_user(post.author)?;
        data.last_post += 1;
        let post = Post::from_new(PostId::new(data.last_post), post);
        data.posts.insert(post.id(), post.clone());

        Ok(post)
    }

    async fn update(&self, post: &Post) -> Result<Post, DomainError> {
        let mut data = self.write()?;

        data.require_post(post.id())?;
        data.posts.insert(post.id(), post.clone());

        Ok(post.clone())
    }

    async fn delete(&self, id: PostId) -> Result<bool, DomainError> {
        Ok(self.write()?.remove_post(id))
    }

    async fn list(
        &self,
        scope: PostScope,
        viewer: &Principal,
        page: PageRequest,
    ) -> Result<Page<Post>, DomainError> {
        let data = self.read()?;

        let feed_authors = match scope {
            PostScope::FeedOf(user) => {
                let mut authors = data.following(user);
                authors.insert(user);
                Some(authors)
            }
            _ => None,
        };

        // newest first; ids are assigned in creation order
        let posts: Vec<Post> = data
            .posts
            .values()
            .rev()
            .filter(|post| match (&scope, &feed_authors) {
                (PostScope::Author(author), _) => post.author() == *author,
                (PostScope::FeedOf(_), Some(authors)) => authors.contains(&post.author()),
                _ => true,
            })
            .filter(|post| viewer.can_view(post.visibility(), post.author()))
            .cloned()
            .collect();

        Page::slice(posts, page)
    }
}

#[async_trait]
impl CommentRepository for InMemorySocialStore {
    async fn get(&self, id: CommentId) -> Result<Option<Comment>, DomainError> {
        Ok(self.read()?.comments.get(&id).cloned())
    }

    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError> {
        let mut data = self.write()?;

        data.require_user(comment.author)?;
        data.require_post(comment.post)?;
        data.last_comment += 1;
        let comment = Comment::from_new(CommentId::new(data.last_comment), comment);
        data.comments.insert(comment.id(), comment.clone());

        Ok(comment)
    }

    async fn update(&self, comment: &Comment) -> Result<Comment, DomainError> {
        let mut data = self.write()?;

        if !data.comments.contains_key(&comment.id()) {
            return Err(DomainError::not_found(format!(
                "Comment {} not found",
                comment.id()
            )));
        }
        data.comments.insert(comment.id(), comment.clone());

        Ok(comment.clone())
    }

    async fn delete(&self, id: CommentId) -> Result<bool, DomainError> {
        Ok(self.write()?.remove_comment(id))
    }

    async fn list(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> Result<Page<Comment>, DomainError> {
        let data = self.read()?;

        let comments: Vec<Comment> = data
            .comments
            .values()
            .rev()
            .filter(|c| filter.post.is_none_or(|post| c.post() == post))
            .filter(|c| filter.author.is_none_or(|author| c.author() == author))
            .filter(|c| {
                !filter.public_posts_only
                    || data.posts.get(&c.post()).is_some_and(|p| p.is_public())
            })
            .cloned()
            .collect();

        Page::slice(comments, page)
    }

    async fn for_post(&self, post: PostId) -> Result<Vec<Comment>, DomainError> {
        Ok(self
            .read()?
            .comments
            .values()
            .filter(|c| c.post() == post)
            .cloned()
            .collect())
    }

    async fn count_for_post(&self, post: PostId) -> Result<usize, DomainError> {
        Ok(self
            .read()?
            .comments
            .values()
            .filter(|c| c.post() == post)
            .count())
    }
}

#[async_trait]
impl LikeRepository for InMemorySocialStore {
    async fn toggle(&self, user: UserId, target: LikeTarget) -> Result<LikeToggle, DomainError> {
        let mut data = self.write()?;

        data.require_user(user)?;
        data.require_target(target)?;

        let entry = (user, LikeKey::from(target));
        let liked = if data.likes.remove(&entry) {
            false
        } else {
            data.likes.insert(entry);
            true
        };

        Ok(LikeToggle {
            liked,
            like_count: data.like_count(target.into()),
        })
    }

    async fn count(&self, target: LikeTarget) -> Result<usize, DomainError> {
        Ok(self.read()?.like_count(target.into()))
    }
}

#[async_trait]
impl FollowRepository for InMemorySocialStore {
    async fn toggle(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<FollowToggle, DomainError> {
        validate_follow(follower, followee)?;

        let mut data = self.write()?;
        data.require_user(follower)?;
        data.require_user(followee)?;

        let entry = (follower, followee);
        let following = if data.follows.remove(&entry) {
            false
        } else {
            data.follows.insert(entry);
            true
        };

        Ok(FollowToggle { following })
    }

    async fn counts(&self, user: UserId) -> Result<FollowCounts, DomainError> {
        let data = self.read()?;
        data.require_user(user)?;
        Ok(data.counts(user))
    }

    async fn following(&self, user: UserId) -> Result<Vec<UserId>, DomainError> {
        Ok(self.read()?.following(user).into_iter().collect())
    }

    async fn all_counts(&self, page: PageRequest) -> Result<Page<FollowCounts>, DomainError> {
        let data = self.read()?;
        let counts: Vec<FollowCounts> = data.users.keys().map(|id| data.counts(*id)).collect();
        Page::slice(counts, page)
    }
}
