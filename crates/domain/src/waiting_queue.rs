use std::collections::VecDeque;

use crate::value_objects::UserId;

/// 等待匹配的用户队列
///
/// 严格按到达顺序（FIFO）出队，同一用户最多出现一次。
#[derive(Debug, Default, Clone)]
pub struct WaitingQueue {
    entries: VecDeque<UserId>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加到队尾，已存在时不做任何事。返回是否真正入队。
    pub fn enqueue(&mut self, user: UserId) -> bool {
        if self.entries.contains(&user) {
            return false;
        }
        self.entries.push_back(user);
        true
    }

    /// 从队首开始找第一个不是 `user` 的等待者并移出。
    ///
    /// 队列里只有 `user` 自己时视为空队列。
    pub fn dequeue_match(&mut self, user: UserId) -> Option<UserId> {
        let index = self.entries.iter().position(|&waiting| waiting != user)?;
        self.entries.remove(index)
    }

    /// 放回队首（用于撤销一次失败的出队）
    pub fn requeue_front(&mut self, user: UserId) {
        if !self.entries.contains(&user) {
            self.entries.push_front(user);
        }
    }

    /// 移除用户（幂等）。返回是否确实移除了。
    pub fn remove(&mut self, user: UserId) -> bool {
        match self.entries.iter().position(|&waiting| waiting == user) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.entries.contains(&user)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(id: i64) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn enqueue_is_deduplicated() {
        let mut queue = WaitingQueue::new();
        assert!(queue.enqueue(uid(1)));
        assert!(!queue.enqueue(uid(1)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn dequeue_match_is_fifo() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(uid(1));
        queue.enqueue(uid(2));
        queue.enqueue(uid(3));

        assert_eq!(queue.dequeue_match(uid(9)), Some(uid(1)));
        assert_eq!(queue.dequeue_match(uid(9)), Some(uid(2)));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![uid(3)]);
    }

    #[test]
    fn dequeue_match_skips_the_caller() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(uid(1));
        queue.enqueue(uid(2));

        assert_eq!(queue.dequeue_match(uid(1)), Some(uid(2)));
        assert!(queue.contains(uid(1)));
    }

    #[test]
    fn lone_caller_gets_no_match() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(uid(1));

        assert_eq!(queue.dequeue_match(uid(1)), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(uid(1));
        queue.enqueue(uid(2));

        assert!(queue.remove(uid(1)));
        assert!(!queue.remove(uid(1)));
        assert!(queue.contains(uid(2)));
        assert_eq!(queue.dequeue_match(uid(3)), Some(uid(2)));
    }
}
