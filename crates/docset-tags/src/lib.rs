//! Category tags on the docset data-access layer.
//!
//! A tag is an object at `category:<cid>:tag:<tagId>`, listed in two sorted
//! sets per category: `category:<cid>:tag` (tag keys ranked by creation
//! time) and `category:<cid>:tag:name` (`<name>:<tag key>` values for
//! lookup by name). Ids come from the shared `nextTagId` counter and each
//! category keeps a `tags` count.

pub mod error;
pub mod roles;
pub mod service;
pub mod tag;

pub use error::{TagError, TagResult};
pub use roles::{RoleProvider, StaticRoles};
pub use service::{TagConfig, TagService};
pub use tag::{slugify, sanitize_name, NewTag, Tag};
