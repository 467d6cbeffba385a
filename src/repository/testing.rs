//! In-memory store for tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tempfile::TempDir;

use super::{DocumentStore, Result, StoreError};
use crate::models::{Document, EntityKind, KnownEntities};

pub(crate) struct MemoryStore {
    dir: TempDir,
    docs: Mutex<HashMap<i64, (Document, Vec<u8>)>>,
    known: Mutex<KnownEntities>,
    writes: AtomicUsize,
    copies: AtomicUsize,
    fail_writes: AtomicBool,
    fail_copies: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            docs: Mutex::new(HashMap::new()),
            known: Mutex::new(KnownEntities::default()),
            writes: AtomicUsize::new(0),
            copies: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_copies: AtomicBool::new(false),
        }
    }

    /// Add a document and return its ID.
    pub fn add(&self, file_name: &str, mime: &str, text: &str, data: &[u8]) -> i64 {
        let mut doc = Document::new(
            file_name.to_string(),
            file_name.to_string(),
            mime.to_string(),
            data.len() as i64,
        );
        doc.extracted_text = text.to_string();
        let mut docs = self.docs.lock().unwrap();
        let id = docs.len() as i64 + 1;
        doc.id = id;
        docs.insert(id, (doc, data.to_vec()));
        id
    }

    /// Count of `update_ocr` + `update_document` calls that succeeded.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Count of `extract_cached_copy` calls.
    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub fn set_fail_copies(&self, fail: bool) {
        self.fail_copies.store(fail, Ordering::SeqCst);
    }

    pub fn doc(&self, id: i64) -> Document {
        self.docs.lock().unwrap()[&id].0.clone()
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn extract_cached_copy(&self, id: i64) -> Result<PathBuf> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        if self.fail_copies.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("cache unreadable")));
        }
        let docs = self.docs.lock().unwrap();
        let (doc, data) = docs.get(&id).ok_or(StoreError::NotFound(id))?;
        let path = self.dir.path().join(format!("{}-{}", id, doc.file_name));
        std::fs::write(&path, data)?;
        Ok(path)
    }

    fn update_ocr(&self, id: i64, text: &str, tsv: &str) -> Result<()> {
        self.check_write()?;
        let mut docs = self.docs.lock().unwrap();
        let (doc, _) = docs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        doc.ocr_text = Some(text.to_string());
        doc.ocr_tsv = Some(tsv.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_document(&self, id: i64) -> Result<Document> {
        let docs = self.docs.lock().unwrap();
        docs.get(&id)
            .map(|(doc, _)| doc.clone())
            .ok_or(StoreError::NotFound(id))
    }

    fn update_document(&self, doc: &Document) -> Result<()> {
        self.check_write()?;
        let mut docs = self.docs.lock().unwrap();
        let (stored, _) = docs.get_mut(&doc.id).ok_or(StoreError::NotFound(doc.id))?;
        *stored = doc.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn list_known_entity_names(&self) -> Result<KnownEntities> {
        Ok(self.known.lock().unwrap().clone())
    }

    fn insert_document(&self, doc: &Document, data: &[u8]) -> Result<i64> {
        Ok(self.add(&doc.file_name, &doc.mime_type, &doc.extracted_text, data))
    }

    fn list_documents(&self) -> Result<Vec<Document>> {
        let docs = self.docs.lock().unwrap();
        Ok(docs.values().map(|(doc, _)| doc.clone()).collect())
    }

    fn add_entity(&self, kind: EntityKind, name: &str) -> Result<()> {
        let mut known = self.known.lock().unwrap();
        let list = match kind {
            EntityKind::Vendor => &mut known.vendors,
            EntityKind::Project => &mut known.projects,
            EntityKind::Appliance => &mut known.appliances,
            _ => return Ok(()),
        };
        list.push(name.to_string());
        Ok(())
    }
}
