//! Tag composition.
//!
//! Every emitted sample carries a flat string map of tags. The
//! [`TagComposer`] builds it from, in order of increasing precedence:
//!
//! 1. cached row metadata (`column`, `alias`, `descr`);
//! 2. the index suffix, either decomposed into `grouping` / `member` /
//!    `element` / `item` words or verbatim as `suffix`;
//! 3. the target `host`;
//! 4. the caller's static tags;
//! 5. the source identifier as `oid`, when requested.

use crate::cache::ColumnCache;
use crate::decode::index_words;
use crate::oid::{Oid, join_arcs};
use std::collections::BTreeMap;

/// Sample tags.
pub type Tags = BTreeMap<String, String>;

pub const TAG_COLUMN: &str = "column";
pub const TAG_ALIAS: &str = "alias";
pub const TAG_DESCR: &str = "descr";
pub const TAG_SUFFIX: &str = "suffix";
pub const TAG_HOST: &str = "host";
pub const TAG_OID: &str = "oid";

/// Tag names for decomposed index words, in order.
pub const INDEX_TAGS: [&str; 4] = ["grouping", "member", "element", "item"];

/// Builds the tag set for each sample of one session.
#[derive(Debug, Clone)]
pub struct TagComposer {
    host: String,
    fixed: Tags,
    oid_tag: bool,
    suffix_tag: bool,
}

impl TagComposer {
    pub fn new(host: impl Into<String>, fixed: Tags, oid_tag: bool, suffix_tag: bool) -> Self {
        Self {
            host: host.into(),
            fixed,
            oid_tag,
            suffix_tag,
        }
    }

    /// Compose tags for the sample `name` read from `oid`, whose index
    /// suffix beyond the matched table entry is `suffix`.
    ///
    /// Returns `None` when the column cache suppresses the sample.
    pub fn compose(
        &self,
        name: &str,
        oid: &Oid,
        suffix: &[u32],
        cache: Option<&ColumnCache>,
    ) -> Option<Tags> {
        let mut tags = Tags::new();
        let key = join_arcs(suffix);
        if let Some(cache) = cache
            && !cache.annotate(name, &key, &mut tags)
        {
            return None;
        }

        if self.suffix_tag {
            if !key.is_empty() {
                tags.insert(TAG_SUFFIX.to_string(), key);
            }
        } else {
            for (tag, word) in INDEX_TAGS.iter().zip(index_words(suffix)) {
                if !word.is_empty() {
                    tags.insert((*tag).to_string(), word);
                }
            }
        }

        tags.insert(TAG_HOST.to_string(), self.host.clone());
        tags.extend(self.fixed.iter().map(|(k, v)| (k.clone(), v.clone())));
        if self.oid_tag {
            tags.insert(TAG_OID.to_string(), oid.dotted());
        }
        Some(tags)
    }
}
