//! In-memory FluidDB data: users, namespaces, tags, objects and tag values.

use std::collections::{BTreeMap, HashMap};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

pub const VALUE_CONTENT_TYPE: &str = "application/vnd.fluiddb.value+json";

pub const ABOUT_TAG: &str = "fluiddb/about";
pub const USERNAME_TAG: &str = "fluiddb/users/username";

#[derive(Clone, Debug)]
pub struct User {
    pub name: String,
    pub password: String,
    pub id: Uuid,
}

#[derive(Clone, Debug)]
pub struct Namespace {
    pub id: Uuid,
    pub description: String,
}

#[derive(Clone, Debug)]
pub struct Tag {
    pub id: Uuid,
    pub description: String,
    pub indexed: bool,
}

/// A stored tag value: raw bytes plus the content type it was PUT with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagValue {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl TagValue {
    pub fn primitive(json: &serde_json::Value) -> Self {
        Self {
            content_type: VALUE_CONTENT_TYPE.to_string(),
            bytes: json.to_string().into_bytes(),
        }
    }

    /// The JSON form of a primitive value, `None` for opaque ones.
    pub fn as_json(&self) -> Option<serde_json::Value> {
        if self.content_type != VALUE_CONTENT_TYPE {
            return None;
        }
        serde_json::from_slice(&self.bytes).ok()
    }
}

#[derive(Debug, Default)]
pub struct Store {
    pub users: HashMap<String, User>,
    pub namespaces: BTreeMap<String, Namespace>,
    pub tags: BTreeMap<String, Tag>,
    /// `fluiddb/about` value to object id.
    pub abouts: HashMap<String, Uuid>,
    pub objects: HashMap<Uuid, BTreeMap<String, TagValue>>,
}

impl Store {
    /// A store holding the `fluiddb` system namespace and one user.
    pub fn seeded(username: &str, password: &str) -> Self {
        let mut store = Store::default();
        store.add_namespace("fluiddb", "FluidDB system namespace");
        store.add_namespace("fluiddb/users", "Holds tags that relate to users");
        store.add_tag(ABOUT_TAG, "A description of what an object is about", true);
        store.add_tag(USERNAME_TAG, "Holds the username of a user", true);
        store.add_user(username, password);
        store
    }

    pub fn add_user(&mut self, name: &str, password: &str) -> Uuid {
        let id = self.about_object(&format!("Object for the user named {name}"));
        self.set_value(id, USERNAME_TAG, TagValue::primitive(&serde_json::json!(name)));
        self.users.insert(
            name.to_string(),
            User {
                name: name.to_string(),
                password: password.to_string(),
                id,
            },
        );
        self.add_namespace(name, &format!("Namespace for the user {name}"));
        id
    }

    pub fn add_namespace(&mut self, path: &str, description: &str) -> Uuid {
        let namespace = Namespace {
            id: self.about_object(&format!("Object for the namespace {path}")),
            description: description.to_string(),
        };
        let id = namespace.id;
        self.namespaces.insert(path.to_string(), namespace);
        id
    }

    pub fn add_tag(&mut self, path: &str, description: &str, indexed: bool) -> Uuid {
        let tag = Tag {
            id: self.about_object(&format!("Object for the attribute {path}")),
            description: description.to_string(),
            indexed,
        };
        let id = tag.id;
        self.tags.insert(path.to_string(), tag);
        id
    }

    /// The object carrying `about`, created on first use.
    pub fn about_object(&mut self, about: &str) -> Uuid {
        if let Some(id) = self.abouts.get(about) {
            return *id;
        }
        let id = Uuid::new_v4();
        self.abouts.insert(about.to_string(), id);
        self.objects.entry(id).or_default().insert(
            ABOUT_TAG.to_string(),
            TagValue::primitive(&serde_json::json!(about)),
        );
        id
    }

    pub fn set_value(&mut self, object: Uuid, tag: &str, value: TagValue) {
        self.objects
            .entry(object)
            .or_default()
            .insert(tag.to_string(), value);
    }

    pub fn value(&self, object: Uuid, tag: &str) -> Option<&TagValue> {
        self.objects.get(&object).and_then(|values| values.get(tag))
    }

    pub fn remove_value(&mut self, object: Uuid, tag: &str) -> Option<TagValue> {
        self.objects
            .get_mut(&object)
            .and_then(|values| values.remove(tag))
    }

    /// Remove a tag and every value stored under it.
    pub fn remove_tag(&mut self, path: &str) -> Option<Tag> {
        let tag = self.tags.remove(path)?;
        for values in self.objects.values_mut() {
            values.remove(path);
        }
        Some(tag)
    }

    /// Direct child names of a namespace: `(namespaces, tags)`.
    pub fn children(&self, path: &str) -> (Vec<String>, Vec<String>) {
        let prefix = format!("{path}/");
        let direct = |key: &String| {
            key.strip_prefix(&prefix)
                .filter(|rest| !rest.contains('/'))
                .map(str::to_string)
        };
        (
            self.namespaces.keys().filter_map(direct).collect(),
            self.tags.keys().filter_map(direct).collect(),
        )
    }

    /// Objects that have a value for `tag`.
    pub fn objects_with(&self, tag: &str) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .objects
            .iter()
            .filter(|(_, values)| values.contains_key(tag))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Resolve a Basic `Authorization` header value to a username.
    ///
    /// Returns `None` for anything that is not a valid user/password pair.
    pub fn authenticate(&self, authorization: &str) -> Option<String> {
        let token = authorization.strip_prefix("Basic ")?;
        let decoded = STANDARD.decode(token.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (name, password) = decoded.split_once(':')?;
        self.users
            .get(name)
            .filter(|user| user.password == password)
            .map(|user| user.name.clone())
    }
}

/// True for JSON scalars and lists of strings.
pub fn is_primitive(json: &serde_json::Value) -> bool {
    match json {
        serde_json::Value::Array(items) => items.iter().all(serde_json::Value::is_string),
        serde_json::Value::Object(_) => false,
        _ => true,
    }
}

/// The namespace a path belongs to, e.g. `test` for `test/ns/tag`.
pub fn owner(path: &str) -> &str {
    path.split('/').next().unwrap_or_default()
}

/// Split `ns/sub/tag` into `("ns/sub", "tag")`.
pub fn parent(path: &str) -> Option<(&str, &str)> {
    path.rsplit_once('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_store_has_user_object() {
        let store = Store::seeded("test", "test");
        let user = &store.users["test"];
        let value = store.value(user.id, USERNAME_TAG).unwrap();
        assert_eq!(value.content_type, VALUE_CONTENT_TYPE);
        assert_eq!(value.as_json(), Some(serde_json::json!("test")));
        assert!(store.namespaces.contains_key("test"));
    }

    #[test]
    fn authenticate_checks_password() {
        let store = Store::seeded("test", "test");
        assert_eq!(store.authenticate("Basic dGVzdDp0ZXN0").as_deref(), Some("test"));
        let bad = format!("Basic {}", STANDARD.encode("test:nope"));
        assert_eq!(store.authenticate(&bad), None);
        assert_eq!(store.authenticate("Bearer abc"), None);
        assert_eq!(store.authenticate("Basic !!!"), None);
    }

    #[test]
    fn about_object_is_stable() {
        let mut store = Store::default();
        let first = store.about_object("foo");
        assert_eq!(store.about_object("foo"), first);
        assert_ne!(store.about_object("bar"), first);
    }

    #[test]
    fn children_lists_direct_entries_only() {
        let mut store = Store::seeded("test", "test");
        store.add_namespace("test/a", "");
        store.add_namespace("test/a/b", "");
        store.add_tag("test/t", "", false);
        let (namespaces, tags) = store.children("test");
        assert_eq!(namespaces, vec!["a".to_string()]);
        assert_eq!(tags, vec!["t".to_string()]);
    }

    #[test]
    fn removing_tag_drops_values() {
        let mut store = Store::seeded("test", "test");
        store.add_tag("test/t", "", false);
        let id = store.about_object("foo");
        store.set_value(id, "test/t", TagValue::primitive(&serde_json::json!(1)));
        assert_eq!(store.objects_with("test/t"), vec![id]);
        store.remove_tag("test/t").unwrap();
        assert!(store.value(id, "test/t").is_none());
    }

    #[test]
    fn path_helpers() {
        assert_eq!(owner("test/ns/tag"), "test");
        assert_eq!(parent("test/ns/tag"), Some(("test/ns", "tag")));
        assert_eq!(parent("test"), None);
        assert!(is_primitive(&serde_json::json!(["a", "b"])));
        assert!(!is_primitive(&serde_json::json!(["a", 1])));
    }
}
