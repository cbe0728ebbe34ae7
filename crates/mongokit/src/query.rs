//! Find options builder for `Client::find_many`

use bson::Document as BsonDocument;
use mongodb::options::FindOptions;

/// Builder for the options of a multi-document find
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptionsBuilder {
    projection: Vec<String>,
    sort: Option<(String, bool)>,
    skip: Option<u64>,
    limit: Option<i64>,
}

impl FindOptionsBuilder {
    /// Create an empty builder: no projection, sort, skip or limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Only return the given fields
    pub fn project<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sort by `key`, ascending (1) or descending (-1)
    pub fn sort_by(mut self, key: impl Into<String>, ascending: bool) -> Self {
        self.sort = Some((key.into(), ascending));
        self
    }

    /// Set the number of documents to skip
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of documents to return
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Projection document, `{ key: 1 }` per projected field
    pub fn projection_document(&self) -> Option<BsonDocument> {
        if self.projection.is_empty() {
            return None;
        }
        let mut projection = BsonDocument::new();
        for key in &self.projection {
            projection.insert(key.as_str(), 1);
        }
        Some(projection)
    }

    /// Sort document, `{ key: 1 | -1 }`
    pub fn sort_document(&self) -> Option<BsonDocument> {
        self.sort.as_ref().map(|(key, ascending)| {
            let order = if *ascending { 1 } else { -1 };
            let mut sort = BsonDocument::new();
            sort.insert(key.as_str(), order);
            sort
        })
    }

    /// Build the driver options
    pub fn build(&self) -> FindOptions {
        let mut options = FindOptions::default();
        options.limit = self.limit;
        options.skip = self.skip;
        options.sort = self.sort_document();
        options.projection = self.projection_document();
        options
    }
}
