//! Context-scoped cache backend
//!
//! Storage lives in a transaction cache owned by an execution context.
//! A connection resolves its context from the `ctx` open parameter and
//! addresses the cache with `(contract name, dbname ++ key)`. The raw
//! concatenation keeps databases sharing one cache apart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, VfsError};
use crate::vfs::param::{ParamResolver, ParamSlot};

use super::{KvBackend, KvConnection};

/// Name of the open parameter carrying the context id
pub const CONTEXT_PARAM: &str = "ctx";

/// The externally supplied cache contract
pub trait TxCache: Send + Sync {
    /// `Ok(None)` when the key is absent
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()>;
}

/// In-process cache, one sorted map per bucket
#[derive(Default)]
pub struct MemoryCache {
    buckets: RwLock<HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held in `bucket`
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }
}

impl TxCache for MemoryCache {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

/// An execution context: its id, the contract it runs, and its cache
pub struct Context {
    pub id: i64,
    pub contract_name: String,
    pub cache: Arc<dyn TxCache>,
}

/// Registry of live contexts, keyed by id
#[derive(Default)]
pub struct ContextManager {
    contexts: RwLock<HashMap<i64, Arc<Context>>>,
}

impl ContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a context, replacing any previous one with the same id
    pub fn register(
        &self,
        id: i64,
        contract_name: impl Into<String>,
        cache: Arc<dyn TxCache>,
    ) -> Arc<Context> {
        let context = Arc::new(Context {
            id,
            contract_name: contract_name.into(),
            cache,
        });
        self.contexts.write().insert(id, Arc::clone(&context));
        context
    }

    pub fn context(&self, id: i64) -> Option<Arc<Context>> {
        self.contexts.read().get(&id).cloned()
    }

    pub fn remove(&self, id: i64) -> Option<Arc<Context>> {
        self.contexts.write().remove(&id)
    }
}

/// Backend resolving connections through a [`ContextManager`]
#[derive(Clone)]
pub struct CacheKv {
    contexts: Arc<ContextManager>,
}

impl CacheKv {
    pub fn new(contexts: Arc<ContextManager>) -> Self {
        Self { contexts }
    }
}

impl KvBackend for CacheKv {
    type Conn = CacheConn;

    fn open(&self, path: &str, params: &dyn ParamResolver) -> Result<CacheConn> {
        let mut ctx_id: i64 = 0;
        params.resolve(CONTEXT_PARAM, ParamSlot::Int(&mut ctx_id));

        let context = self
            .contexts
            .context(ctx_id)
            .ok_or(VfsError::ContextNotFound(ctx_id))?;
        tracing::debug!("CacheKv opened {} in context {}", path, ctx_id);

        Ok(CacheConn {
            dbname: path.to_string(),
            context: Some(context),
        })
    }
}

/// Connection into one context's cache
pub struct CacheConn {
    dbname: String,
    context: Option<Arc<Context>>,
}

impl CacheConn {
    /// `dbname ++ key`, no separator
    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.dbname.len() + key.len());
        full.extend_from_slice(self.dbname.as_bytes());
        full.extend_from_slice(key);
        full
    }

    fn context(&self) -> Result<&Context> {
        self.context.as_deref().ok_or(VfsError::Closed)
    }
}

impl KvConnection for CacheConn {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let ctx = self.context()?;
        tracing::trace!("put ctx {} len {}", ctx.id, value.len());
        ctx.cache.put(&ctx.contract_name, &self.full_key(key), value)
    }

    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        let ctx = self.context()?;
        ctx.cache
            .get(&ctx.contract_name, &self.full_key(key))?
            .ok_or(VfsError::NotFound)
    }

    fn close(&mut self) -> Result<()> {
        self.context = None;
        Ok(())
    }
}
