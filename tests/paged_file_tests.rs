//! Tests for the paged file layer against every backend
//!
//! These tests verify:
//! - Page-aligned write/read round trips
//! - Size tracking and the high-water mark
//! - End-of-data reads with a zeroed tail
//! - Reopen preserves size and contents

use std::sync::Arc;

use pagevfs::backend::{CacheKv, ContextManager, FileKv, LsmKv, MemoryCache};
use pagevfs::config::WalSyncStrategy;
use pagevfs::vfs::{NoParams, UriParams};
use pagevfs::{Config, File, FileSystem, KvBackend, ReadOutcome, PAGE_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn file_backend() -> (TempDir, FileSystem<FileKv>) {
    let temp = TempDir::new().unwrap();
    let fs = FileSystem::new(FileKv::new(temp.path()));
    (temp, fs)
}

fn lsm_backend() -> (TempDir, FileSystem<LsmKv>) {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .root_dir(temp.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .memtable_size_limit(3 * PAGE_SIZE) // Small to exercise flushes
        .compaction_threshold(3)
        .build();
    let fs = FileSystem::with_config(LsmKv::new(config.clone()), &config);
    (temp, fs)
}

fn cache_backend() -> FileSystem<CacheKv> {
    let contexts = Arc::new(ContextManager::new());
    contexts.register(1, "contract", Arc::new(MemoryCache::new()));
    FileSystem::new(CacheKv::new(contexts))
}

fn ctx1() -> UriParams {
    UriParams::parse("ctx=1")
}

/// Scenario: 8192 bytes of 0xAB, then read inside and past the data
fn check_concrete_scenario<B: KvBackend>(fs: &FileSystem<B>, params: &UriParams) {
    let mut file = fs.open("scenario.db", params).unwrap();

    assert_eq!(file.write_at(&[0xAB; 2 * PAGE_SIZE], 0).unwrap(), 8192);
    assert_eq!(file.size(), 8192);

    let mut page = vec![0u8; PAGE_SIZE];
    assert_eq!(file.read_at(&mut page, 4096).unwrap(), ReadOutcome::Complete(4096));
    assert!(page.iter().all(|&b| b == 0xAB));

    let mut tail = [0x55u8; 100];
    assert_eq!(file.read_at(&mut tail, 8192).unwrap(), ReadOutcome::EndOfData(0));
    assert_eq!(tail, [0u8; 100]);

    file.close().unwrap();
}

fn check_reopen_preserves<B: KvBackend>(fs: &FileSystem<B>, params: &UriParams) {
    let pattern: Vec<u8> = (0..2 * PAGE_SIZE).map(|i| (i * 7 % 256) as u8).collect();
    {
        let mut file = fs.open("persist.db", params).unwrap();
        file.write_at(&pattern, PAGE_SIZE as u64).unwrap();
        file.close().unwrap();
    }

    let mut file = fs.open("persist.db", params).unwrap();
    assert_eq!(file.size(), 3 * PAGE_SIZE as u64);

    let mut buf = vec![0u8; pattern.len()];
    assert!(file.read_at(&mut buf, PAGE_SIZE as u64).unwrap().is_complete());
    assert_eq!(buf, pattern);
    file.close().unwrap();
}

fn check_read_past_end<B: KvBackend>(fs: &FileSystem<B>, params: &UriParams) {
    let mut file = fs.open("short.db", params).unwrap();
    file.write_at(&[0x01; PAGE_SIZE], 0).unwrap();

    let mut buf = vec![0xFFu8; PAGE_SIZE];
    let outcome = file.read_at(&mut buf, PAGE_SIZE as u64 / 2).unwrap();
    assert_eq!(outcome, ReadOutcome::EndOfData(PAGE_SIZE / 2));
    assert!(buf[..PAGE_SIZE / 2].iter().all(|&b| b == 0x01));
    assert!(buf[PAGE_SIZE / 2..].iter().all(|&b| b == 0));
}

fn check_size_monotonic<B: KvBackend>(fs: &FileSystem<B>, params: &UriParams) {
    let mut file = fs.open("grow.db", params).unwrap();
    let mut last = 0;
    for offset in [3u64, 0, 5, 1, 5] {
        file.write_at(&[offset as u8; PAGE_SIZE], offset * PAGE_SIZE as u64).unwrap();
        assert!(file.size() >= last);
        last = file.size();
    }
    assert_eq!(file.size(), 6 * PAGE_SIZE as u64);
}

// =============================================================================
// Local-file backend
// =============================================================================

#[test]
fn test_files_concrete_scenario() {
    let (_temp, fs) = file_backend();
    check_concrete_scenario(&fs, &UriParams::default());
}

#[test]
fn test_files_reopen_preserves_data() {
    let (_temp, fs) = file_backend();
    check_reopen_preserves(&fs, &UriParams::default());
}

#[test]
fn test_files_read_past_end() {
    let (_temp, fs) = file_backend();
    check_read_past_end(&fs, &UriParams::default());
}

#[test]
fn test_files_size_monotonic() {
    let (_temp, fs) = file_backend();
    check_size_monotonic(&fs, &UriParams::default());
}

// =============================================================================
// Embedded LSM backend
// =============================================================================

#[test]
fn test_lsm_concrete_scenario() {
    let (_temp, fs) = lsm_backend();
    check_concrete_scenario(&fs, &UriParams::default());
}

#[test]
fn test_lsm_reopen_preserves_data() {
    let (_temp, fs) = lsm_backend();
    check_reopen_preserves(&fs, &UriParams::default());
}

#[test]
fn test_lsm_read_past_end() {
    let (_temp, fs) = lsm_backend();
    check_read_past_end(&fs, &UriParams::default());
}

#[test]
fn test_lsm_size_monotonic() {
    let (_temp, fs) = lsm_backend();
    check_size_monotonic(&fs, &UriParams::default());
}

#[test]
fn test_lsm_reopen_after_drop() {
    let (_temp, fs) = lsm_backend();
    {
        let mut file = fs.open("crash.db", &NoParams).unwrap();
        file.write_at(&[0x42; PAGE_SIZE], 0).unwrap();
    }

    let mut file = fs.open("crash.db", &NoParams).unwrap();
    assert_eq!(file.size(), PAGE_SIZE as u64);
    let mut buf = [0u8; 16];
    assert!(file.read_at(&mut buf, 0).unwrap().is_complete());
    assert_eq!(buf, [0x42; 16]);
}

#[test]
fn test_lsm_reopen_after_torn_table_write() {
    let (temp, fs) = lsm_backend();
    {
        let mut file = fs.open("db", &NoParams).unwrap();
        file.write_at(&[0x42; PAGE_SIZE], 0).unwrap();
        file.close().unwrap();
    }

    // Crash while a table was being written: only its header made it out
    let partial = temp.path().join("db").join("sstables").join("table_000002.sst.tmp");
    std::fs::write(&partial, b"PVST\x01\x00").unwrap();

    let mut file = fs.open("db", &NoParams).unwrap();
    assert!(!partial.exists());
    assert_eq!(file.size(), PAGE_SIZE as u64);
    let mut buf = [0u8; 16];
    assert!(file.read_at(&mut buf, 0).unwrap().is_complete());
    assert_eq!(buf, [0x42; 16]);

    file.write_at(&[0x43; PAGE_SIZE], PAGE_SIZE as u64).unwrap();
    assert_eq!(file.size(), 2 * PAGE_SIZE as u64);
}

// =============================================================================
// Context-scoped cache backend
// =============================================================================

#[test]
fn test_cache_concrete_scenario() {
    let fs = cache_backend();
    check_concrete_scenario(&fs, &ctx1());
}

#[test]
fn test_cache_reopen_preserves_data() {
    let fs = cache_backend();
    check_reopen_preserves(&fs, &ctx1());
}

#[test]
fn test_cache_read_past_end() {
    let fs = cache_backend();
    check_read_past_end(&fs, &ctx1());
}

#[test]
fn test_cache_size_monotonic() {
    let fs = cache_backend();
    check_size_monotonic(&fs, &ctx1());
}

#[test]
fn test_cache_names_do_not_collide() {
    let fs = cache_backend();
    let mut a = fs.open("alpha", &ctx1()).unwrap();
    let mut b = fs.open("beta", &ctx1()).unwrap();

    a.write_at(&[0xAA; PAGE_SIZE], 0).unwrap();
    b.write_at(&[0xBB; 2 * PAGE_SIZE], 0).unwrap();

    let mut buf = vec![0u8; PAGE_SIZE];
    a.read_at(&mut buf, 0).unwrap();
    assert!(buf.iter().all(|&x| x == 0xAA));
    b.read_at(&mut buf, 0).unwrap();
    assert!(buf.iter().all(|&x| x == 0xBB));

    assert_eq!(a.size(), PAGE_SIZE as u64);
    assert_eq!(b.size(), 2 * PAGE_SIZE as u64);
}

#[test]
fn test_cache_open_without_context_fails() {
    let fs = cache_backend();
    assert!(fs.open("db", &NoParams).is_err());
    assert!(fs.open_uri("db?ctx=2").is_err());
    assert!(fs.open_uri("db?ctx=1").is_ok());
}

// =============================================================================
// Alignment policy
// =============================================================================

#[test]
fn test_strict_alignment_from_config() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().strict_alignment(true).build();
    let fs = FileSystem::with_config(FileKv::new(temp.path()), &config);

    let mut file = fs.open("strict.db", &NoParams).unwrap();
    assert!(file.write_at(&[0u8; 512], 0).is_err());
    assert_eq!(file.write_at(&[0u8; PAGE_SIZE], PAGE_SIZE as u64).unwrap(), PAGE_SIZE);
    assert_eq!(file.size(), 2 * PAGE_SIZE as u64);
}
