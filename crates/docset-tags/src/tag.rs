use serde::{Deserialize, Serialize};

/// Input to [`TagService::create`](crate::TagService::create).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
    pub cid: u64,
    pub userid: u64,
}

impl NewTag {
    pub fn new(name: impl Into<String>, cid: u64, userid: u64) -> Self {
        Self {
            name: name.into(),
            cid,
            userid,
        }
    }
}

/// A stored tag object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_scheme")]
    pub scheme: String,
    pub cid: u64,
    pub tag_id: u64,
    pub userid: u64,
    pub name: String,
    pub posts: u64,
    pub slug: String,
    pub created_at: String,
}

pub const TAG_SCHEME: &str = "category:cid:tag:tagId";

pub fn category_key(cid: u64) -> String {
    format!("category:{cid}")
}

pub fn tag_key(cid: u64, tag_id: u64) -> String {
    format!("category:{cid}:tag:{tag_id}")
}

/// Sorted set of a category's tag keys, ranked by creation time.
pub fn tag_index_key(cid: u64) -> String {
    format!("category:{cid}:tag")
}

/// Sorted set of `<name>:<tag key>` values for prefix lookup by name.
pub fn tag_name_index_key(cid: u64) -> String {
    format!("category:{cid}:tag:name")
}

/// Name-index value for a tag.
pub fn tag_name_entry(name: &str, key: &str) -> String {
    format!("{}:{key}", sanitize_name(name).to_lowercase())
}

/// Replace `:` so a name cannot be confused with key segments.
pub fn sanitize_name(name: &str) -> String {
    name.replace(':', "-")
}

/// Lowercase ASCII slug: runs of anything but letters and digits become one
/// `-`, with none at either end.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
