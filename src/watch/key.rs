use crate::constants::KEY_SEPARATOR;
use crate::Result;
use crate::StoreError;

/// Identity metadata every watched object exposes
pub trait ObjectMeta {
    fn name(&self) -> &str;

    /// `None` (or empty) for cluster-scoped objects
    fn namespace(&self) -> Option<&str>;
}

/// Last known state of an object whose deletion was observed only after
/// the fact (e.g. missed while the watch was disconnected)
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedFinalStateUnknown<O> {
    pub key: String,
    pub obj: Option<O>,
}

/// Payload of a delete notification
#[derive(Debug, Clone, PartialEq)]
pub enum Deleted<O> {
    Object(O),
    Tombstone(DeletedFinalStateUnknown<O>),
}

/// `namespace/name`, or `name` for cluster-scoped objects
pub fn meta_namespace_key<O: ObjectMeta>(obj: &O) -> Result<String> {
    let name = obj.name();
    if name.is_empty() {
        return Err(StoreError::InvalidKey("object has no name".into()).into());
    }
    match obj.namespace() {
        Some(namespace) if !namespace.is_empty() => Ok(format!("{namespace}{KEY_SEPARATOR}{name}")),
        _ => Ok(name.to_string()),
    }
}

/// Key of a deleted object; tombstones carry their key already
pub fn deletion_handling_key<O: ObjectMeta>(deleted: &Deleted<O>) -> Result<String> {
    match deleted {
        Deleted::Object(obj) => meta_namespace_key(obj),
        Deleted::Tombstone(tombstone) if !tombstone.key.is_empty() => Ok(tombstone.key.clone()),
        Deleted::Tombstone(_) => Err(StoreError::InvalidKey("tombstone has no key".into()).into()),
    }
}

/// Inverse of [`meta_namespace_key`]: `(namespace, name)`
pub fn split_meta_namespace_key(key: &str) -> Result<(Option<&str>, &str)> {
    let mut parts = key.split(KEY_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) if !name.is_empty() => Ok((None, name)),
        (Some(namespace), Some(name), None) if !name.is_empty() => {
            Ok(((!namespace.is_empty()).then_some(namespace), name))
        }
        _ => Err(StoreError::InvalidKey(format!("unexpected key format: {key:?}")).into()),
    }
}
