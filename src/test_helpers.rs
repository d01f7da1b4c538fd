// In-memory collaborators for handler and extraction tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::db::{CategorySource, DocumentRepository};
use crate::llm::LLMAdapter;
use crate::models::{AppState, Category, ExpenseDocument};
use crate::storage::{ObjectStore, ObjectUrls, PutObject, StoreError, StoredObject};
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://localhost/expense_docs_test"),
        ("ENABLE_EXPENSE_DOCUMENTS", "true"),
        ("S3_UPLOAD_BUCKET", "receipts"),
        ("S3_UPLOAD_REGION", "eu-west-1"),
        ("S3_UPLOAD_KEY", "test-key"),
        ("S3_UPLOAD_SECRET", "test-secret"),
        ("ENABLE_RECEIPT_EXTRACT", "true"),
        ("OPENAI_API_KEY", "test-openai-key"),
    ]);
    Config::from_lookup(move |key: &str| vars.get(key).map(|v| v.to_string()))
        .expect("test configuration is valid")
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, PutObject>>,
    deleted: Mutex<Vec<String>>,
    fail_puts: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, key: &str, body: &[u8], content_type: &str) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            PutObject {
                body: bytes::Bytes::copy_from_slice(body),
                content_type: content_type.to_string(),
                content_disposition: None,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<PutObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, key: &str, object: PutObject) -> Result<(), StoreError> {
        if self.fail_puts {
            return Err(StoreError::Internal("bucket unavailable".to_string()));
        }
        self.objects.lock().unwrap().insert(key.to_string(), object);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<StoredObject, StoreError> {
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(StoredObject {
            body: object.body.clone(),
            // Empty content type stands for "not reported by the store".
            content_type: Some(object.content_type.clone()).filter(|t| !t.is_empty()),
            content_length: Some(object.body.len() as u64),
        })
    }

    async fn sign_url(&self, key: &str, expires_in: Duration) -> Result<String, StoreError> {
        Ok(format!(
            "https://signed.example/{}?expires={}",
            key,
            expires_in.as_secs()
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDocuments {
    rows: Mutex<HashMap<String, ExpenseDocument>>,
    find_calls: AtomicUsize,
    fail_inserts: bool,
}

impl MemoryDocuments {
    pub fn failing() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, document: ExpenseDocument) {
        self.rows
            .lock()
            .unwrap()
            .insert(document.id.clone(), document);
    }

    pub fn all(&self) -> Vec<ExpenseDocument> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocuments {
    async fn insert(&self, document: &ExpenseDocument) -> Result<ExpenseDocument, sqlx::Error> {
        if self.fail_inserts {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.seed(document.clone());
        Ok(document.clone())
    }

    async fn find(&self, id: &str) -> Result<Option<ExpenseDocument>, sqlx::Error> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        if self.fail_inserts {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

pub struct StaticCategories {
    categories: Vec<Category>,
    calls: AtomicUsize,
}

impl StaticCategories {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CategorySource for StaticCategories {
    async fn list(&self) -> Result<Vec<Category>, sqlx::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.categories.clone())
    }
}

/// Scripted model: returns a canned reply and records every request.
pub struct FakeModel {
    reply: Mutex<Result<String, String>>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl Default for FakeModel {
    fn default() -> Self {
        Self {
            reply: Mutex::new(Ok(String::new())),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeModel {
    pub fn reply_with(&self, content: &str) {
        *self.reply.lock().unwrap() = Ok(content.to_string());
    }

    pub fn fail_with(&self, detail: &str) {
        *self.reply.lock().unwrap() = Err(detail.to_string());
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMAdapter for FakeModel {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Ok(content) => Ok(LLMResponse {
                content,
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            }),
            Err(detail) => Err(AppError::LLMApi(detail)),
        }
    }
}

/// Configuration plus fakes; build an [`AppState`] after adjusting either.
pub struct TestContext {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub documents: Arc<MemoryDocuments>,
    pub categories: Arc<StaticCategories>,
    pub model: Arc<FakeModel>,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            store: Arc::new(MemoryStore::default()),
            documents: Arc::new(MemoryDocuments::default()),
            categories: Arc::new(StaticCategories::new(vec![
                Category {
                    id: 1,
                    grouping: "Food and Drink".to_string(),
                    name: "Groceries".to_string(),
                },
                Category {
                    id: 2,
                    grouping: "Transportation".to_string(),
                    name: "Taxi".to_string(),
                },
            ])),
            model: Arc::new(FakeModel::default()),
        }
    }

    pub fn state(&self) -> AppState {
        let store: Option<Arc<dyn ObjectStore>> = if self.config.storage.is_configured() {
            Some(self.store.clone())
        } else {
            None
        };

        AppState {
            config: Arc::new(self.config.clone()),
            store,
            urls: ObjectUrls::from_config(&self.config.storage),
            documents: self.documents.clone(),
            categories: self.categories.clone(),
            model: self.model.clone(),
        }
    }

    pub fn router(&self) -> axum::Router {
        crate::routes::create_router(self.state())
    }
}
