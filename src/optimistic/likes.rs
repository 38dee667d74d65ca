//! Like toggles for the feed.

use serde::{Deserialize, Serialize};

use super::coordinator::{OptimisticCoordinator, Reducer};
use crate::data::Post;

/// The part of a post a like changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub likes: i64,
    pub is_liked: bool,
}

impl From<&Post> for LikeState {
    fn from(post: &Post) -> Self {
        Self {
            likes: post.likes,
            is_liked: post.is_liked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Toggle,
}

/// Flips `is_liked` and moves `likes` with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LikeReducer;

impl Reducer for LikeReducer {
    type Value = LikeState;
    type Action = LikeAction;

    fn reduce(&self, current: &LikeState, action: &LikeAction) -> Result<LikeState, String> {
        match action {
            LikeAction::Toggle if current.is_liked => {
                if current.likes <= 0 {
                    return Err("cannot unlike a post with no likes".to_string());
                }
                Ok(LikeState {
                    likes: current.likes - 1,
                    is_liked: false,
                })
            }
            LikeAction::Toggle => Ok(LikeState {
                likes: current.likes + 1,
                is_liked: true,
            }),
        }
    }
}

/// Optimistic like state keyed by post id.
pub type LikeCoordinator = OptimisticCoordinator<i64, LikeReducer>;

impl LikeCoordinator {
    /// Seeds every post in a freshly read feed.
    pub fn seed_posts<'a>(&self, posts: impl IntoIterator<Item = &'a Post>) {
        for post in posts {
            self.seed(post.id, LikeState::from(post));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::optimistic::MutationStatus;

    fn liked(likes: i64, is_liked: bool) -> LikeState {
        LikeState { likes, is_liked }
    }

    #[test]
    fn test_toggle_adjusts_count_with_flag() {
        let r = LikeReducer;
        assert_eq!(r.reduce(&liked(1, false), &LikeAction::Toggle), Ok(liked(2, true)));
        assert_eq!(r.reduce(&liked(2, true), &LikeAction::Toggle), Ok(liked(1, false)));
    }

    #[test]
    fn test_unlike_at_zero_is_refused() {
        assert!(LikeReducer.reduce(&liked(0, true), &LikeAction::Toggle).is_err());
    }

    #[tokio::test]
    async fn test_like_flow_success() {
        let likes = LikeCoordinator::new(LikeReducer);
        likes.seed(7, liked(1, false));

        let handle = likes.apply(7, LikeAction::Toggle).unwrap();
        assert_eq!(likes.visible(&7), Some(liked(2, true)));

        let settled = handle.resolve(async { Ok(liked(2, true)) }).await.unwrap();
        assert_eq!(settled, liked(2, true));
        assert_eq!(likes.status(&7), Some(MutationStatus::Settled));
    }

    #[tokio::test]
    async fn test_like_flow_failure_reverts() {
        let likes = LikeCoordinator::new(LikeReducer);
        likes.seed(7, liked(1, false));

        let handle = likes.apply(7, LikeAction::Toggle).unwrap();
        assert_eq!(likes.visible(&7), Some(liked(2, true)));

        let result = handle
            .resolve(async { Err(CacheError::MutationFailed("rejected".into())) })
            .await;
        assert!(matches!(result, Err(CacheError::MutationFailed(_))));
        assert_eq!(likes.visible(&7), Some(liked(1, false)));
        assert_eq!(likes.status(&7), Some(MutationStatus::Reverted));
    }
}
