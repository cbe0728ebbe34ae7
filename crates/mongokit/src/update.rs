//! Update operators accepted by the client helpers

use bson::{doc, Document as BsonDocument};
use std::fmt;

/// MongoDB update operator applied by `Client::update_one` and friends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateType {
    /// Set field values
    #[default]
    Set,
    /// Remove fields
    Unset,
    /// Rename fields
    Rename,
    /// Add to numeric fields
    Inc,
    /// Append one element to an array
    Push,
    /// Append several elements to an array
    PushAll,
    /// Append an element if not already present
    AddToSet,
    /// Remove the first or last array element
    Pop,
    /// Remove array elements matching a condition
    Pull,
    /// Remove all listed values from an array
    PullAll,
}

impl UpdateType {
    /// The `$`-prefixed operator name
    pub fn as_operator(&self) -> &'static str {
        match self {
            UpdateType::Set => "$set",
            UpdateType::Unset => "$unset",
            UpdateType::Rename => "$rename",
            UpdateType::Inc => "$inc",
            UpdateType::Push => "$push",
            UpdateType::PushAll => "$pushAll",
            UpdateType::AddToSet => "$addToSet",
            UpdateType::Pop => "$pop",
            UpdateType::Pull => "$pull",
            UpdateType::PullAll => "$pullAll",
        }
    }

    /// Wrap `updater` as `{ <operator>: updater }`
    pub fn document(&self, updater: BsonDocument) -> BsonDocument {
        let op = self.as_operator();
        doc! { op: updater }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_operator())
    }
}

/// Combined `$set` + `$inc` update document
pub fn set_and_inc(set: BsonDocument, inc: BsonDocument) -> BsonDocument {
    let mut update = UpdateType::Set.document(set);
    update.insert(UpdateType::Inc.as_operator(), inc);
    update
}
