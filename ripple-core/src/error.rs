//! Reactive errors

use thiserror::Error;

use crate::reactive::SubscriberId;

/// Result type for fallible reactive operations
pub type Result<T> = std::result::Result<T, ReactiveError>;

/// Misuse the runtime refuses to go along with
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    #[error("memo {memo} cannot be created while memo {parent} is computing")]
    NestedMemo {
        memo: SubscriberId,
        parent: SubscriberId,
    },

    #[error("memo {memo} cannot be created while effect {effect} is running")]
    MemoInsideEffect {
        memo: SubscriberId,
        effect: SubscriberId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_computations() {
        let memo = SubscriberId::new();
        let effect = SubscriberId::new();
        let message = ReactiveError::MemoInsideEffect { memo, effect }.to_string();

        assert!(message.contains(&memo.to_string()));
        assert!(message.contains(&effect.to_string()));
    }
}
