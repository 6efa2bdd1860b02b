//! Cache key space
//!
//! Every cached read is addressed by a key derived only from the kind of
//! payload and the inputs that change the result:
//!
//! ```text
//! v{SCHEMA}:{kind}:{identity}[:{qualifier}={value}]*[:page={n}]
//! ```
//!
//! Qualifiers are kept in a `BTreeMap` so they always render in name order.
//! Paged kinds always carry the page size as the `size` qualifier, so two
//! requests for the same page number at different sizes never share a key.
//! The key without its page suffix is the scope base; the key index tracks
//! live pages per base.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::ids::UserId;
use crate::domain::pagination::PageRequest;
use crate::domain::DomainError;

/// Bumped whenever a payload shape changes so old entries are never read
pub const KEY_SCHEMA_VERSION: u32 = 1;

/// Identity segment of every global collection key
pub const GLOBAL_IDENTITY: &str = "all";
const VIEWER_QUALIFIER: &str = "viewer";
const SIZE_QUALIFIER: &str = "size";

/// Kinds of cached payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    User,
    Users,
    Post,
    Posts,
    UserPosts,
    Comment,
    Comments,
    PostComments,
    UserComments,
    Feed,
    FollowerCount,
    AllFollowers,
    ProfilePhoto,
}

impl CacheKind {
    pub const ALL: [CacheKind; 13] = [
        Self::User,
        Self::Users,
        Self::Post,
        Self::Posts,
        Self::UserPosts,
        Self::Comment,
        Self::Comments,
        Self::PostComments,
        Self::UserComments,
        Self::Feed,
        Self::FollowerCount,
        Self::AllFollowers,
        Self::ProfilePhoto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Users => "users",
            Self::Post => "post",
            Self::Posts => "posts",
            Self::UserPosts => "user_posts",
            Self::Comment => "comment",
            Self::Comments => "comments",
            Self::PostComments => "post_comments",
            Self::UserComments => "user_comments",
            Self::Feed => "feed",
            Self::FollowerCount => "follower_count",
            Self::AllFollowers => "all_followers",
            Self::ProfilePhoto => "profile_photo",
        }
    }

    /// Collections are cached page by page
    pub fn is_paged(&self) -> bool {
        matches!(
            self,
            Self::Users
                | Self::Posts
                | Self::UserPosts
                | Self::Comments
                | Self::PostComments
                | Self::UserComments
                | Self::Feed
                | Self::AllFollowers
        )
    }

    /// Result depends on who is asking, so the viewer must be part of the key
    pub fn is_viewer_scoped(&self) -> bool {
        matches!(self, Self::Posts | Self::UserPosts)
    }

    /// Global kinds have a single scope per qualifier set
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Users | Self::Posts | Self::Comments | Self::AllFollowers)
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("Unknown cache kind: '{}'", s)))
    }
}

/// Inputs that distinguish entries of one kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyScope {
    identity: Option<String>,
    qualifiers: BTreeMap<String, String>,
    page: Option<PageRequest>,
}

impl KeyScope {
    /// Scope of a global collection
    pub fn global() -> Self {
        Self::default()
    }

    /// Scope keyed on one entity
    pub fn of(identity: impl fmt::Display) -> Self {
        Self {
            identity: Some(identity.to_string()),
            ..Default::default()
        }
    }

    pub fn viewer(self, viewer: UserId) -> Self {
        self.with_qualifier(VIEWER_QUALIFIER, viewer)
    }

    pub fn with_qualifier(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.qualifiers.insert(name.into(), value.to_string());
        self
    }

    /// Address one page of a collection at the requested size
    pub fn paged(mut self, request: PageRequest) -> Self {
        self.page = Some(request);
        self
    }
}

/// A fully built cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: CacheKind,
    base: String,
    page: Option<u32>,
    page_size: Option<u32>,
    full: String,
}

impl CacheKey {
    /// Key of one page under an already built scope base
    pub fn for_page(kind: CacheKind, base: &str, page: u32) -> Self {
        Self {
            kind,
            base: base.to_string(),
            page: Some(page),
            page_size: base_page_size(base),
            full: format!("{}:page={}", base, page),
        }
    }

    /// Key of an unpaged kind from its base
    pub fn unpaged(kind: CacheKind, base: &str) -> Self {
        Self {
            kind,
            base: base.to_string(),
            page: None,
            page_size: None,
            full: base.to_string(),
        }
    }

    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    /// The key without its page suffix
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn page(&self) -> Option<u32> {
        self.page
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Build the key for `kind` under `scope`
///
/// Pure and deterministic. Rejects scopes that would let two different result
/// sets share a key.
pub fn build_key(kind: CacheKind, scope: &KeyScope) -> Result<CacheKey, DomainError> {
    if kind.is_viewer_scoped() && !scope.qualifiers.contains_key(VIEWER_QUALIFIER) {
        return Err(DomainError::validation(format!(
            "Cache kind '{}' is viewer-scoped and needs a viewer",
            kind
        )));
    }

    let identity = match (&scope.identity, kind.is_global()) {
        (Some(identity), false) => identity.as_str(),
        (None, true) => GLOBAL_IDENTITY,
        (None, false) => {
            return Err(DomainError::validation(format!(
                "Cache kind '{}' needs an identity",
                kind
            )));
        }
        (Some(_), true) => {
            return Err(DomainError::validation(format!(
                "Cache kind '{}' is global and takes no identity",
                kind
            )));
        }
    };

    if scope.qualifiers.contains_key(SIZE_QUALIFIER) {
        return Err(DomainError::validation(format!(
            "Qualifier '{}' is reserved for the page size",
            SIZE_QUALIFIER
        )));
    }

    let page = match (kind.is_paged(), scope.page) {
        (true, Some(page)) => Some(page),
        (false, None) => None,
        (true, None) => {
            return Err(DomainError::validation(format!(
                "Cache kind '{}' is paged and needs a page request",
                kind
            )));
        }
        (false, Some(_)) => {
            return Err(DomainError::validation(format!(
                "Cache kind '{}' is not paged",
                kind
            )));
        }
    };

    let mut qualifiers: BTreeMap<&str, String> = scope
        .qualifiers
        .iter()
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect();
    if let Some(page) = page {
        qualifiers.insert(SIZE_QUALIFIER, page.page_size().to_string());
    }

    let mut base = format!("v{}:{}:{}", KEY_SCHEMA_VERSION, kind, identity);
    for (name, value) in &qualifiers {
        base.push_str(&format!(":{}={}", name, value));
    }

    Ok(match page {
        Some(page) => CacheKey::for_page(kind, &base, page.page()),
        None => CacheKey::unpaged(kind, &base),
    })
}

/// Identity segment of a scope base
pub fn base_identity(base: &str) -> Option<&str> {
    base.split(':').nth(2)
}

/// Page size a paged scope base was built for
pub fn base_page_size(base: &str) -> Option<u32> {
    base.split(':')
        .skip(3)
        .find_map(|segment| segment.strip_prefix("size="))
        .and_then(|size| size.parse().ok())
}

/// Index set holding every live scope base of a kind
pub fn kind_index_key(kind: CacheKind) -> String {
    format!("v{}:idx:kind:{}", KEY_SCHEMA_VERSION, kind)
}

/// Index set holding the live page numbers of one scope base
pub fn pages_index_key(base: &str) -> String {
    format!("v{}:idx:pages:{}", KEY_SCHEMA_VERSION, base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, size: u32) -> PageRequest {
        PageRequest::new(page, size).unwrap()
    }

    #[test]
    fn test_detail_key() {
        let key = build_key(CacheKind::Post, &KeyScope::of(42)).unwrap();

        assert_eq!(key.as_str(), "v1:post:42");
        assert_eq!(key.base(), "v1:post:42");
        assert_eq!(key.page(), None);
        assert_eq!(key.page_size(), None);
    }

    #[test]
    fn test_paged_key() {
        let key = build_key(
            CacheKind::Posts,
            &KeyScope::global().viewer(UserId::new(7)).paged(page(2, 10)),
        )
        .unwrap();

        assert_eq!(key.as_str(), "v1:posts:all:size=10:viewer=7:page=2");
        assert_eq!(key.base(), "v1:posts:all:size=10:viewer=7");
        assert_eq!(key.page(), Some(2));
        assert_eq!(key.page_size(), Some(10));
    }

    #[test]
    fn test_page_sizes_get_distinct_keys() {
        let small = build_key(CacheKind::Users, &KeyScope::global().paged(page(1, 2))).unwrap();
        let large = build_key(CacheKind::Users, &KeyScope::global().paged(page(1, 50))).unwrap();

        assert_ne!(small, large);
        assert_ne!(small.base(), large.base());
        assert_eq!(small.as_str(), "v1:users:all:size=2:page=1");
        assert_eq!(large.as_str(), "v1:users:all:size=50:page=1");
    }

    #[test]
    fn test_key_is_deterministic() {
        let scope = KeyScope::of(3)
            .with_qualifier("author", 9)
            .paged(page(1, 10));

        let a = build_key(CacheKind::PostComments, &scope).unwrap();
        let b = build_key(CacheKind::PostComments, &scope.clone()).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.as_str(), "v1:post_comments:3:author=9:size=10:page=1");
    }

    #[test]
    fn test_qualifier_order_is_stable() {
        let a = KeyScope::of(1)
            .with_qualifier("b", 2)
            .with_qualifier("a", 1)
            .viewer(UserId::new(5))
            .paged(page(1, 10));
        let b = KeyScope::of(1)
            .paged(page(1, 10))
            .viewer(UserId::new(5))
            .with_qualifier("a", 1)
            .with_qualifier("b", 2);

        assert_eq!(
            build_key(CacheKind::UserPosts, &a).unwrap(),
            build_key(CacheKind::UserPosts, &b).unwrap()
        );
    }

    #[test]
    fn test_viewers_get_distinct_keys() {
        let alice = build_key(
            CacheKind::UserPosts,
            &KeyScope::of(1).viewer(UserId::new(1)).paged(page(1, 10)),
        )
        .unwrap();
        let bob = build_key(
            CacheKind::UserPosts,
            &KeyScope::of(1).viewer(UserId::new(2)).paged(page(1, 10)),
        )
        .unwrap();

        assert_ne!(alice, bob);
        assert_ne!(
            build_key(CacheKind::Feed, &KeyScope::of(1).paged(page(1, 10))).unwrap(),
            build_key(CacheKind::Feed, &KeyScope::of(2).paged(page(1, 10))).unwrap()
        );
    }

    #[test]
    fn test_rejects_invalid_scopes() {
        assert!(build_key(CacheKind::Posts, &KeyScope::global().paged(page(1, 10))).is_err());
        assert!(build_key(CacheKind::Users, &KeyScope::global()).is_err());
        assert!(build_key(CacheKind::User, &KeyScope::of(1).paged(page(1, 10))).is_err());
        assert!(build_key(CacheKind::User, &KeyScope::global()).is_err());
        assert!(build_key(CacheKind::Users, &KeyScope::of(1).paged(page(1, 10))).is_err());
        assert!(build_key(
            CacheKind::Users,
            &KeyScope::global().with_qualifier("size", 99).paged(page(1, 10))
        )
        .is_err());
    }

    #[test]
    fn test_for_page_matches_build_key() {
        let built = build_key(CacheKind::Comments, &KeyScope::global().paged(page(4, 25))).unwrap();
        let derived = CacheKey::for_page(CacheKind::Comments, built.base(), 4);

        assert_eq!(built, derived);
        assert_eq!(derived.page_size(), Some(25));
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in CacheKind::ALL {
            assert_eq!(kind.as_str().parse::<CacheKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_index_keys_and_identity() {
        assert_eq!(kind_index_key(CacheKind::Feed), "v1:idx:kind:feed");
        assert_eq!(pages_index_key("v1:feed:3"), "v1:idx:pages:v1:feed:3");
        assert_eq!(base_identity("v1:user_posts:12:viewer=4"), Some("12"));
        assert_eq!(base_page_size("v1:feed:3:size=20"), Some(20));
        assert_eq!(base_page_size("v1:post:3"), None);
    }
}
