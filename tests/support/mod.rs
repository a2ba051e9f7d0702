//! In-memory thread repository shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use boardcache::application::repos::{RepoError, ThreadsRepo};
use boardcache::domain::board::BoardScope;
use boardcache::domain::entities::{Post, Thread};
use time::OffsetDateTime;

#[derive(Default)]
struct State {
    boards: HashSet<String>,
    nsfw: HashSet<String>,
    /// Most recently replied first.
    threads: Vec<Thread>,
    thread_counters: HashMap<u64, u64>,
    board_counters: HashMap<String, u64>,
    all_counter: u64,
    thread_loads: HashMap<u64, usize>,
}

/// Fake oracle with adjustable counters, call accounting, injectable delays
/// and failures.
#[derive(Default)]
pub struct FakeRepo {
    state: Mutex<State>,
    thread_delay_ms: AtomicUsize,
    ids_delay_ms: AtomicUsize,
    fail_threads: AtomicBool,
    fail_ids: AtomicBool,
    id_loads: AtomicUsize,
    catalog_loads: AtomicUsize,
    nsfw_loads: AtomicUsize,
}

fn timestamp(seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000 + seconds)
        .expect("timestamp within range")
}

fn post(id: u64) -> Post {
    Post {
        id,
        time: timestamp(i64::try_from(id).expect("small id")),
        name: None,
        body: format!("post {id}"),
    }
}

impl FakeRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake repo state poisoned")
    }

    pub fn add_board(&self, name: &str, nsfw: bool) {
        let mut state = self.state();
        state.boards.insert(name.to_string());
        state.board_counters.entry(name.to_string()).or_insert(1);
        if nsfw {
            state.nsfw.insert(name.to_string());
        }
    }

    /// Add a thread with `replies` replies as the most recently bumped one.
    /// Reply ids follow the thread id.
    pub fn add_thread(&self, board: &str, id: u64, replies: u64) {
        let mut state = self.state();
        state.boards.insert(board.to_string());
        let posts = (1..=replies).map(|n| post(id * 1000 + n)).collect::<Vec<_>>();
        let thread = Thread {
            id,
            board: board.to_string(),
            subject: format!("thread {id}"),
            post_count: u32::try_from(replies + 1).expect("small thread"),
            image_count: 0,
            reply_time: timestamp(0),
            bump_time: timestamp(0),
            abbrev: false,
            op: post(id),
            posts,
        };
        state.threads.insert(0, thread);
        state.thread_counters.insert(id, 1);
        *state.board_counters.entry(board.to_string()).or_insert(0) += 1;
        state.all_counter += 1;
    }

    /// Simulate a new post in `id`, moving every counter that covers it.
    pub fn bump_thread(&self, id: u64) {
        let mut state = self.state();
        let board = state
            .threads
            .iter()
            .find(|thread| thread.id == id)
            .map(|thread| thread.board.clone())
            .expect("bumped thread exists");
        *state.thread_counters.entry(id).or_insert(0) += 1;
        *state.board_counters.entry(board).or_insert(0) += 1;
        state.all_counter += 1;
    }

    pub fn bump_board(&self, board: &str) {
        let mut state = self.state();
        *state.board_counters.entry(board.to_string()).or_insert(0) += 1;
        state.all_counter += 1;
    }

    pub fn remove_thread(&self, id: u64) {
        let mut state = self.state();
        state.threads.retain(|thread| thread.id != id);
        state.thread_counters.remove(&id);
    }

    pub fn set_thread_delay(&self, delay: Duration) {
        self.thread_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn set_ids_delay(&self, delay: Duration) {
        self.ids_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn fail_threads(&self, fail: bool) {
        self.fail_threads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_ids(&self, fail: bool) {
        self.fail_ids.store(fail, Ordering::SeqCst);
    }

    pub fn thread_loads(&self, id: u64) -> usize {
        self.state().thread_loads.get(&id).copied().unwrap_or(0)
    }

    pub fn total_thread_loads(&self) -> usize {
        self.state().thread_loads.values().sum()
    }

    pub fn id_loads(&self) -> usize {
        self.id_loads.load(Ordering::SeqCst)
    }

    pub fn catalog_loads(&self) -> usize {
        self.catalog_loads.load(Ordering::SeqCst)
    }

    pub fn nsfw_loads(&self) -> usize {
        self.nsfw_loads.load(Ordering::SeqCst)
    }

    async fn pause(delay_ms: &AtomicUsize) {
        let delay = delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
    }
}

fn on_board(thread: &Thread, board: &BoardScope) -> bool {
    match board {
        BoardScope::All => true,
        BoardScope::Board(name) => &thread.board == name,
    }
}

#[async_trait]
impl ThreadsRepo for FakeRepo {
    async fn thread_counter(&self, id: u64) -> Result<u64, RepoError> {
        self.state()
            .thread_counters
            .get(&id)
            .copied()
            .ok_or(RepoError::NotFound)
    }

    async fn board_counter(&self, board: &BoardScope) -> Result<u64, RepoError> {
        let state = self.state();
        match board {
            BoardScope::All => Ok(state.all_counter),
            BoardScope::Board(name) => state
                .board_counters
                .get(name)
                .copied()
                .ok_or(RepoError::NotFound),
        }
    }

    async fn thread(&self, id: u64, last_n: u32) -> Result<Thread, RepoError> {
        // The failure flag is sampled on entry so a slow failing build keeps
        // failing even if the flag is cleared while it sleeps.
        let fail = self.fail_threads.load(Ordering::SeqCst);
        Self::pause(&self.thread_delay_ms).await;
        if fail {
            return Err(RepoError::Timeout);
        }

        let mut state = self.state();
        *state.thread_loads.entry(id).or_insert(0) += 1;
        let mut thread = state
            .threads
            .iter()
            .find(|thread| thread.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)?;

        if last_n > 0 {
            let keep = last_n as usize;
            let excess = thread.posts.len().saturating_sub(keep);
            thread.posts.drain(..excess);
            thread.abbrev = true;
        }
        Ok(thread)
    }

    async fn catalog(&self, board: &BoardScope) -> Result<Vec<Thread>, RepoError> {
        self.catalog_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state()
            .threads
            .iter()
            .filter(|thread| on_board(thread, board))
            .map(|thread| Thread {
                posts: Vec::new(),
                ..thread.clone()
            })
            .collect())
    }

    async fn thread_ids(&self, board: &BoardScope) -> Result<Vec<u64>, RepoError> {
        Self::pause(&self.ids_delay_ms).await;
        self.id_loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_ids.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection reset"));
        }

        Ok(self
            .state()
            .threads
            .iter()
            .filter(|thread| on_board(thread, board))
            .map(|thread| thread.id)
            .collect())
    }

    async fn nsfw_boards(&self) -> Result<HashSet<String>, RepoError> {
        self.nsfw_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state().nsfw.clone())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// A cache and API-only descriptor set over `repo`.
pub fn harness(
    repo: &Arc<FakeRepo>,
    config: boardcache::cache::CacheConfig,
) -> (boardcache::cache::ViewCache, boardcache::cache::Frontends) {
    let cache = boardcache::cache::ViewCache::new(&config);
    let frontends = boardcache::cache::Frontends::new(repo.clone(), None, &config);
    (cache, frontends)
}
