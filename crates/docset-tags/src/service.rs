use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use docset_store::{DocStore, ParamOptions, SortedSetEntry};
use docset_types::Document;
use futures_util::future::{try_join3, try_join4, try_join_all};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{TagError, TagResult};
use crate::roles::RoleProvider;
use crate::tag::{
    category_key, slugify, tag_index_key, tag_key, tag_name_entry, tag_name_index_key, NewTag, Tag,
    TAG_SCHEME,
};

/// Tunables for [`TagService`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    pub max_name_length: usize,
    /// Holding any of these roles allows removing tags.
    pub elevated_roles: Vec<String>,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            max_name_length: 25,
            elevated_roles: vec![
                "administrator".into(),
                "globalModerator".into(),
                "moderator".into(),
            ],
        }
    }
}

/// Category tags stored as objects with two sorted-set indexes per category.
pub struct TagService {
    store: DocStore,
    roles: Arc<dyn RoleProvider>,
    config: TagConfig,
}

fn require(id: u64, what: &str) -> TagResult<()> {
    if id == 0 {
        return Err(TagError::InvalidArgument(format!("a valid {what} is required")));
    }
    Ok(())
}

fn to_document(tag: &Tag) -> TagResult<Document> {
    Ok(serde_json::from_value(serde_json::to_value(tag)?)?)
}

fn or_default_fields<'a>(fields: &'a [&'a str], default: &'a [&'a str]) -> &'a [&'a str] {
    if fields.is_empty() {
        default
    } else {
        fields
    }
}

impl TagService {
    pub fn new(store: DocStore, roles: Arc<dyn RoleProvider>) -> Self {
        Self {
            store,
            roles,
            config: TagConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TagConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &DocStore {
        &self.store
    }

    /// Create a tag in an existing category.
    ///
    /// Allocates the id from the global `nextTagId` counter, writes the tag
    /// object, indexes it by creation time and by name, and bumps the
    /// category's `tags` counter.
    pub async fn create(&self, input: NewTag) -> TagResult<Tag> {
        require(input.userid, "userid")?;
        require(input.cid, "category id")?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(TagError::InvalidArgument("tag name is required".into()));
        }
        let len = name.chars().count();
        if len > self.config.max_name_length {
            return Err(TagError::NameTooLong {
                max: self.config.max_name_length,
                len,
            });
        }

        let opts = ParamOptions::default();
        let cid = input.cid;
        let category = category_key(cid);
        if self.store.get_object::<&str>(&category, &[], &opts).await?.is_none() {
            return Err(TagError::CategoryNotFound(cid));
        }

        let tag_id = self
            .store
            .increment_field_count("nextTagId", None)
            .await?
            .and_then(|id| id.as_u64())
            .ok_or(TagError::IdUnavailable)?;
        let key = tag_key(cid, tag_id);
        let now = Utc::now();
        let tag = Tag {
            key: key.clone(),
            scheme: TAG_SCHEME.into(),
            cid,
            tag_id,
            userid: input.userid,
            name: name.to_string(),
            posts: 0,
            slug: format!("{tag_id}/{}", slugify(name)),
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let rank = now.timestamp_millis() as f64;
        let entries = vec![
            SortedSetEntry::new(tag_index_key(cid), key.as_str(), rank),
            SortedSetEntry::new(tag_name_index_key(cid), tag_name_entry(name, &key), rank),
        ];
        try_join3(
            self.store.set_object(&key, to_document(&tag)?, &opts),
            self.store.sorted_set_add_keys(entries, &opts),
            self.store.increment_field_count("tags", Some(&category)),
        )
        .await?;

        info!(cid, tag_id, name, "tag created");
        Ok(tag)
    }

    /// The tag object, reshaped to `fields` when any are given.
    pub async fn get_by_id(
        &self,
        tag_id: u64,
        cid: u64,
        fields: &[&str],
    ) -> TagResult<Option<Document>> {
        require(tag_id, "tag id")?;
        require(cid, "category id")?;
        let doc = self
            .store
            .get_object(&tag_key(cid, tag_id), fields, &ParamOptions::default())
            .await?;
        Ok(doc)
    }

    /// The tag object as a [`Tag`].
    pub async fn get_tag(&self, tag_id: u64, cid: u64) -> TagResult<Option<Tag>> {
        match self.get_by_id(tag_id, cid, &[]).await? {
            Some(doc) => Ok(Some(serde_json::from_value(Value::Object(doc))?)),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, tag_id: u64, cid: u64) -> TagResult<bool> {
        Ok(self.get_by_id(tag_id, cid, &[]).await?.is_some())
    }

    /// Every tag of a category, oldest first. Defaults to the `name` and
    /// `tagId` fields.
    pub async fn get_by_category_id(&self, cid: u64, fields: &[&str]) -> TagResult<Vec<Document>> {
        require(cid, "category id")?;
        let opts = ParamOptions::default();
        let fields = or_default_fields(fields, &["name", "tagId"]);
        let keys = self
            .store
            .fetch_sorted_sets_range(&[tag_index_key(cid)], 0, -1, &opts)
            .await?;
        let reads = keys
            .iter()
            .filter_map(Value::as_str)
            .map(|key| self.store.get_object(key, fields, &opts));
        let docs = try_join_all(reads).await?;
        Ok(docs.into_iter().flatten().collect())
    }

    /// The tag of a category with exactly this name (case-insensitive).
    /// Defaults to the `name`, `tagId` and `cid` fields.
    pub async fn get_by_category_id_and_name(
        &self,
        cid: u64,
        name: &str,
        fields: &[&str],
    ) -> TagResult<Option<Document>> {
        require(cid, "category id")?;
        let fields = or_default_fields(fields, &["name", "tagId", "cid"]);
        // Entries of this name sort between `<name>:` and `<name>;`, since
        // `;` is the byte after `:` and names carry no colons.
        let prefix = tag_name_entry(name.trim(), "");
        let stem = prefix.trim_end_matches(':');
        let hits = self
            .store
            .get_sorted_sets_lexical(
                &tag_name_index_key(cid),
                &format!("[{prefix}"),
                &format!("({stem};"),
                0,
                None,
                &ParamOptions::default(),
            )
            .await?;

        // The oldest tag wins when a name was indexed more than once.
        let tag_id = hits
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|entry| entry.rsplit(':').next())
            .filter_map(|id| id.parse::<u64>().ok())
            .min();
        match tag_id {
            Some(tag_id) => self.get_by_id(tag_id, cid, fields).await,
            None => {
                debug!(cid, name, "no tag with this name");
                Ok(None)
            }
        }
    }

    /// Delete a tag and its index entries. `caller_id` must hold one of the
    /// configured elevated roles.
    pub async fn remove(&self, cid: u64, tag_id: u64, caller_id: u64) -> TagResult<()> {
        require(caller_id, "caller id")?;
        require(cid, "category id")?;
        require(tag_id, "tag id")?;

        let opts = ParamOptions::default();
        let category = category_key(cid);
        if self.store.get_object::<&str>(&category, &[], &opts).await?.is_none() {
            return Err(TagError::CategoryNotFound(cid));
        }
        let tag = self
            .get_tag(tag_id, cid)
            .await?
            .ok_or(TagError::TagNotFound { cid, tag_id })?;

        let roles = self.roles.roles(caller_id).await?;
        if !roles.iter().any(|r| self.config.elevated_roles.contains(r)) {
            return Err(TagError::PermissionDenied(caller_id));
        }

        try_join4(
            self.store.delete_objects(&tag.key, &opts),
            self.store.sorted_set_remove_key(&tag_index_key(cid), tag.key.as_str(), &opts),
            self.store.sorted_set_remove_key(
                &tag_name_index_key(cid),
                tag_name_entry(&tag.name, &tag.key),
                &opts,
            ),
            self.store.decrement_field_count("tags", Some(&category)),
        )
        .await?;

        info!(cid, tag_id, caller_id, "tag removed");
        Ok(())
    }
}
