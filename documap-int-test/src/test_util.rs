use documap::common::{Document, Value};
use documap::doc;
use documap::errors::DocumapResult;
use documap::index::Index;
use documap::model::{field_mapping_error, take_id, Model};
use documap::oid::ObjectId;
use documap::repository::Repository;
use documap::store::{MemoryClient, StoreClient};
use std::sync::Arc;

/// A fresh in-memory store per test. Contexts are cheap, so every test gets
/// its own and no cleanup step is needed.
#[derive(Clone)]
pub struct TestContext {
    client: Arc<MemoryClient>,
}

impl TestContext {
    pub fn client(&self) -> Arc<dyn StoreClient> {
        self.client.clone()
    }
}

pub fn create_test_context() -> TestContext {
    TestContext {
        client: Arc::new(MemoryClient::new()),
    }
}

/// The standard fixture model: unique email, free-form name and age.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub age: i64,
}

impl User {
    pub fn new(name: &str, email: &str, age: i64) -> Self {
        User {
            id: None,
            name: name.to_string(),
            email: email.to_string(),
            age,
        }
    }
}

impl Model for User {
    const FIELD_NAMES: &'static [&'static str] = &["name", "email", "age"];

    fn model_name() -> &'static str {
        "User"
    }

    fn from_document(mut doc: Document) -> DocumapResult<Option<Self>> {
        if doc.is_empty() {
            return Ok(None);
        }
        let id = take_id(&mut doc)?;
        let name = match doc.remove("name") {
            Some(Value::String(s)) => s,
            other => return Err(field_mapping_error("User", "name", other.as_ref())),
        };
        let email = match doc.remove("email") {
            Some(Value::String(s)) => s,
            other => return Err(field_mapping_error("User", "email", other.as_ref())),
        };
        let age = match doc.remove("age").as_ref().and_then(Value::as_i64) {
            Some(age) => age,
            None => return Err(field_mapping_error("User", "age", None)),
        };
        Ok(Some(User { id, name, email, age }))
    }

    fn to_document(&self) -> DocumapResult<Document> {
        Ok(doc! {
            "name": (self.name.clone()),
            "email": (self.email.clone()),
            "age": (self.age),
        })
    }

    fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }
}

pub fn user_repository(ctx: &TestContext) -> DocumapResult<Repository<User>> {
    Repository::builder(ctx.client())
        .collection("users")
        .index(Index::on(vec!["email"]).unique())
        .build()
}

/// A second fixture with an optional field, for sparse index coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: Option<ObjectId>,
    pub title: String,
    pub tag: Option<String>,
}

impl Note {
    pub fn new(title: &str, tag: Option<&str>) -> Self {
        Note {
            id: None,
            title: title.to_string(),
            tag: tag.map(str::to_string),
        }
    }
}

impl Model for Note {
    const FIELD_NAMES: &'static [&'static str] = &["title", "tag"];

    fn model_name() -> &'static str {
        "Note"
    }

    fn from_document(mut doc: Document) -> DocumapResult<Option<Self>> {
        if doc.is_empty() {
            return Ok(None);
        }
        let id = take_id(&mut doc)?;
        let title = match doc.remove("title") {
            Some(Value::String(s)) => s,
            other => return Err(field_mapping_error("Note", "title", other.as_ref())),
        };
        let tag = match doc.remove("tag") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            other => return Err(field_mapping_error("Note", "tag", other.as_ref())),
        };
        Ok(Some(Note { id, title, tag }))
    }

    fn to_document(&self) -> DocumapResult<Document> {
        Ok(doc! {
            "title": (self.title.clone()),
            "tag": (self.tag.clone()),
        })
    }

    fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }
}

pub fn note_repository(ctx: &TestContext) -> DocumapResult<Repository<Note>> {
    Repository::builder(ctx.client())
        .collection("notes")
        .index(Index::on(vec!["tag"]).unique().sparse())
        .index(Index::on(vec!["-title"]))
        .build()
}
