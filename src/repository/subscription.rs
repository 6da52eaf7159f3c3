// ==========================================
// 贝类加工追溯系统 - 实时订阅
// ==========================================
// 职责: 集合写入提交后，向订阅方推送最新结果集
// 机制: 每个订阅持有一个 tokio watch 通道 + 一个可重复执行的查询
// 顺序: 结果集按 created_at 倒序（最新在前），由查询保证
// 取消: Subscription::unsubscribe()/drop 关闭接收端，下次发布时惰性清理
// ==========================================

use crate::repository::error::RepositoryResult;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// 集合名（与文档库集合名一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Suppliers,
    RawMaterials,
    Lots,
    ProcessingBatches,
    ProductGrades,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Suppliers => "suppliers",
            Collection::RawMaterials => "rawMaterials",
            Collection::Lots => "lots",
            Collection::ProcessingBatches => "processingBatches",
            Collection::ProductGrades => "productGrades",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 刷新回调: 返回 false 表示接收端已关闭，应被清理
type Refresher = Box<dyn Fn() -> bool + Send + Sync>;

// ==========================================
// ChangeHub - 变更发布中心
// ==========================================
pub struct ChangeHub {
    next_id: AtomicU64,
    watchers: Mutex<HashMap<Collection, Vec<(u64, Refresher)>>>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            watchers: Mutex::new(HashMap::new()),
        }
    }
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建共享实例（仓储之间共用同一个 hub）
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// 注册实时查询
    ///
    /// # 参数
    /// - collection: 订阅的集合
    /// - query: 结果集查询（注册时立即执行一次作为初始值）
    ///
    /// # 注意
    /// - query 会在发布方线程中执行，不能持有调用方已锁定的数据库连接
    pub fn register<T, F>(&self, collection: Collection, query: F) -> RepositoryResult<Subscription<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> RepositoryResult<Vec<T>> + Send + Sync + 'static,
    {
        let initial = query()?;
        let (tx, rx) = watch::channel(initial);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let refresher: Refresher = Box::new(move || {
            if tx.is_closed() {
                return false;
            }
            match query() {
                Ok(rows) => {
                    tx.send_replace(rows);
                }
                Err(e) => {
                    // 保留上一次结果，等待下一次变更
                    tracing::warn!(collection = %collection, subscription_id = id, "订阅刷新失败: {}", e);
                }
            }
            true
        });

        match self.watchers.lock() {
            Ok(mut guard) => guard.entry(collection).or_default().push((id, refresher)),
            Err(poisoned) => poisoned
                .into_inner()
                .entry(collection)
                .or_default()
                .push((id, refresher)),
        }

        tracing::debug!(collection = %collection, subscription_id = id, "注册实时订阅");
        Ok(Subscription {
            id,
            collection,
            receiver: rx,
        })
    }

    /// 发布集合变更: 重新执行该集合所有存活订阅的查询
    pub fn publish(&self, collection: Collection) {
        let mut guard = match self.watchers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(list) = guard.get_mut(&collection) {
            let before = list.len();
            list.retain(|(_, refresh)| refresh());
            let pruned = before - list.len();
            if pruned > 0 {
                tracing::debug!(collection = %collection, pruned, "清理已取消的订阅");
            }
        }
    }

    /// 当前登记的订阅数（含尚未清理的已取消订阅）
    pub fn watcher_count(&self, collection: Collection) -> usize {
        match self.watchers.lock() {
            Ok(guard) => guard.get(&collection).map(Vec::len).unwrap_or(0),
            Err(poisoned) => poisoned.into_inner().get(&collection).map(Vec::len).unwrap_or(0),
        }
    }
}

// ==========================================
// Subscription - 订阅句柄
// ==========================================
pub struct Subscription<T> {
    id: u64,
    collection: Collection,
    receiver: watch::Receiver<Vec<T>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// 自上次读取后是否有新结果集
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// 等待下一次推送；发布端关闭时返回 false
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// 取消订阅
    pub fn unsubscribe(self) {
        tracing::debug!(collection = %self.collection, subscription_id = self.id, "取消实时订阅");
    }
}

impl<T: Clone> Subscription<T> {
    /// 当前结果集（不标记为已读）
    pub fn current(&self) -> Vec<T> {
        self.receiver.borrow().clone()
    }

    /// 读取最新结果集并标记为已读
    pub fn latest(&mut self) -> Vec<T> {
        self.receiver.borrow_and_update().clone()
    }
}
