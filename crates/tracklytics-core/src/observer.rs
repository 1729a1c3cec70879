//! 调试订阅点：旁路观察每一次分发。
//!
//! # 设计背景（Why）
//! - 事件可视化等调试工具需要看到“发出了什么事件、带了哪些属性、发给了谁”，
//!   但它们不应影响分发本身；
//! - 提供两种接入方式：同步回调 [`DispatchObserver`]，以及基于 `futures` 通道的 [`DispatchStream`]，
//!   后者适合在独立任务中异步消费。
//!
//! # 契约说明（What）
//! - 通知发生在全部后端调用结束之后，观察者看不到、也改变不了分发顺序；
//! - 观察者 panic 会被捕获并记录；已被丢弃的订阅流会在下一次发布时被静默移除；
//! - `subscribe` 的队列无上限，持有却从不轮询的流会一直累积记录；长期挂载的调试工具应使用
//!   `subscribe_bounded`，队列满时新记录被丢弃而不是阻塞分发；
//! - 无任何订阅时不会构造 [`DispatchRecord`]，不产生额外拷贝。

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use arc_swap::ArcSwap;
use futures::{
    FutureExt, Stream, StreamExt,
    channel::mpsc::{self, Receiver, Sender, UnboundedReceiver, UnboundedSender, unbounded},
};
use parking_lot::Mutex;

use crate::{attributes::AttributeMap, tracker::TrackerId};

/// 一次分发的只读副本。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchRecord {
    pub event_name: String,
    pub attributes: AttributeMap,
    pub super_attributes: AttributeMap,
    /// 通过过滤的后端 id，按注册顺序排列。
    pub targets: Vec<TrackerId>,
}

/// 同步分发观察者。
pub trait DispatchObserver: Send + Sync {
    fn on_dispatch(&self, record: &DispatchRecord);
}

/// 基于内存的观察者，便于测试与回放。
#[derive(Debug, Default)]
pub struct RecordingObserver {
    records: Mutex<Vec<DispatchRecord>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回当前已记录的分发副本。
    pub fn records(&self) -> Vec<DispatchRecord> {
        self.records.lock().clone()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl DispatchObserver for RecordingObserver {
    fn on_dispatch(&self, record: &DispatchRecord) {
        self.records.lock().push(record.clone());
    }
}

/// 分发记录的异步流。
///
/// 由 [`EventDispatcher::subscribe`](crate::EventDispatcher::subscribe) 创建；丢弃即退订。
#[derive(Debug)]
pub struct DispatchStream {
    receiver: RecordReceiver,
}

#[derive(Debug)]
enum RecordReceiver {
    Unbounded(UnboundedReceiver<DispatchRecord>),
    Bounded(Receiver<DispatchRecord>),
}

enum RecordSender {
    Unbounded(UnboundedSender<DispatchRecord>),
    Bounded(Sender<DispatchRecord>),
}

impl RecordSender {
    /// 投递一条记录；返回 `false` 表示接收端已丢弃，应移除该订阅。
    fn deliver(&mut self, record: &DispatchRecord) -> bool {
        match self {
            RecordSender::Unbounded(sender) => sender.unbounded_send(record.clone()).is_ok(),
            RecordSender::Bounded(sender) => match sender.try_send(record.clone()) {
                Ok(()) => true,
                Err(error) if error.is_full() => {
                    tracing::debug!(
                        target: "tracklytics::observer",
                        event = record.event_name.as_str(),
                        "bounded dispatch stream full, record dropped"
                    );
                    true
                }
                Err(_) => false,
            },
        }
    }
}

impl DispatchStream {
    /// 非阻塞地取出下一条已到达的记录。
    pub fn try_next_record(&mut self) -> Option<DispatchRecord> {
        self.next().now_or_never().flatten()
    }
}

impl Stream for DispatchStream {
    type Item = DispatchRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.receiver {
            RecordReceiver::Unbounded(receiver) => Pin::new(receiver).poll_next(cx),
            RecordReceiver::Bounded(receiver) => Pin::new(receiver).poll_next(cx),
        }
    }
}

/// 观察者与订阅流的集合。
#[derive(Default)]
pub(crate) struct ObserverHub {
    observers: ArcSwap<Vec<Arc<dyn DispatchObserver>>>,
    subscribers: Mutex<Vec<RecordSender>>,
}

impl ObserverHub {
    pub(crate) fn add_observer(&self, observer: Arc<dyn DispatchObserver>) {
        self.observers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&observer));
            next
        });
    }

    pub(crate) fn subscribe(&self) -> DispatchStream {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().push(RecordSender::Unbounded(sender));
        DispatchStream {
            receiver: RecordReceiver::Unbounded(receiver),
        }
    }

    pub(crate) fn subscribe_bounded(&self, capacity: usize) -> DispatchStream {
        let (sender, receiver) = mpsc::channel(capacity);
        self.subscribers.lock().push(RecordSender::Bounded(sender));
        DispatchStream {
            receiver: RecordReceiver::Bounded(receiver),
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.observers.load().is_empty() && self.subscribers.lock().is_empty()
    }

    pub(crate) fn publish(&self, record: DispatchRecord) {
        for observer in self.observers.load().iter() {
            let delivered = catch_unwind(AssertUnwindSafe(|| observer.on_dispatch(&record)));
            if delivered.is_err() {
                tracing::warn!(
                    target: "tracklytics::observer",
                    event = record.event_name.as_str(),
                    "dispatch observer panicked"
                );
            }
        }

        self.subscribers
            .lock()
            .retain_mut(|sender| sender.deliver(&record));
    }
}
