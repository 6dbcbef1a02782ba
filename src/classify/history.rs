use std::collections::VecDeque;

/// 预测历史，最新的在最前
///
/// `limit` 为 0 时不限长度，否则超出时丢弃最旧的记录。
#[derive(Debug, Clone, Default)]
pub struct HistoryTracker {
    entries: VecDeque<String>,
    limit: usize,
}

impl HistoryTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn record(&mut self, label: impl Into<String>) {
        self.entries.push_front(label.into());
        if self.limit > 0 {
            self.entries.truncate(self.limit);
        }
    }

    /// 只读、可重复遍历的历史视图
    pub fn list(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.entries.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
