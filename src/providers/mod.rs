//! Outbound adapters: the external item store and the emoji lookup service.
//!
//! Both are behind object-safe traits so the actor and the HTTP surface hold
//! `Arc<dyn ...>` and tests substitute stubs. Both degrade instead of
//! failing: clients never observe a transient adapter error.

pub mod emoji;
pub mod items;

pub use emoji::{fallback_emoji, EmojiService, HttpEmojiService};
pub use items::{HttpItemStore, ItemStore, NullItemStore, Suggestion};
