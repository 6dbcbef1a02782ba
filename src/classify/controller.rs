//! 分类控制器
//!
//! 展示状态（当前文本、识别出的蝴蝶、历史记录）只由控制器任务持有和修改。
//! 推理在阻塞线程池上运行，完成后经控制器自己的通道送回，再由控制器写入状态。
//! 每个请求分配递增的令牌；新请求到达时，旧请求被取消并收到 `Superseded`，
//! 迟到的旧结果直接丢弃。

use crate::{
    classify::{
        ClassificationPipeline, ClassificationResult, ClassifyOptions, ClassifyStatus,
        DisplaySnapshot, HistoryTracker,
    },
    image::ImageSource,
    utils::error::ClassifierError,
    Result,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// 尚未选择图片时的展示文本
pub const NO_PHOTO_SELECTED: &str = "No photo selected";

type Reply = oneshot::Sender<Result<ClassificationResult>>;

enum Command {
    Classify {
        source: ImageSource,
        options: ClassifyOptions,
        status_tx: Option<mpsc::UnboundedSender<ClassifyStatus>>,
        reply: Reply,
    },
    Snapshot {
        reply: oneshot::Sender<DisplaySnapshot>,
    },
    History {
        reply: oneshot::Sender<Vec<String>>,
    },
}

struct Completion {
    token: u64,
    result: Result<ClassificationResult>,
}

/// 控制器拥有的展示状态
#[derive(Debug, Clone)]
pub struct DisplayState {
    pub classification_label: String,
    pub identified_butterfly: Option<String>,
    pub history: HistoryTracker,
}

impl DisplayState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            classification_label: NO_PHOTO_SELECTED.to_string(),
            identified_butterfly: None,
            history: HistoryTracker::new(history_limit),
        }
    }

    fn apply(&mut self, result: &Result<ClassificationResult>) {
        match result {
            Ok(result) => {
                let label = result.prediction.label.clone();
                self.classification_label = label.clone();
                self.identified_butterfly = Some(label.clone());
                self.history.record(label);
            }
            Err(e) => {
                self.classification_label = e.display_message();
                self.identified_butterfly = None;
            }
        }
    }
}

/// 控制器的发送端，可在多个处理器间克隆共享
#[derive(Clone)]
pub struct ClassifierHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ClassifierHandle {
    /// 提交一次分类，等待结果。被更新的请求取代时返回 `Superseded`。
    pub async fn classify(
        &self,
        source: impl Into<ImageSource>,
        options: ClassifyOptions,
        status_tx: Option<mpsc::UnboundedSender<ClassifyStatus>>,
    ) -> Result<ClassificationResult> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Classify {
            source: source.into(),
            options,
            status_tx,
            reply,
        })?;
        rx.await.map_err(|_| Self::stopped())?
    }

    pub async fn snapshot(&self) -> Result<DisplaySnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        rx.await.map_err(|_| Self::stopped())
    }

    pub async fn history(&self) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::History { reply })?;
        rx.await.map_err(|_| Self::stopped())
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| Self::stopped())
    }

    fn stopped() -> ClassifierError {
        ClassifierError::Internal("Classifier controller stopped".to_string())
    }
}

pub struct ClassifierController {
    pipeline: ClassificationPipeline,
    state: DisplayState,
    next_token: u64,
    pending: Option<(u64, Reply)>,
    in_flight: Option<JoinHandle<()>>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ClassifierController {
    /// 启动控制器任务，返回句柄。所有句柄被丢弃后任务退出。
    pub fn spawn(pipeline: ClassificationPipeline, history_limit: usize) -> ClassifierHandle {
        let (tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let controller = Self {
            pipeline,
            state: DisplayState::new(history_limit),
            next_token: 0,
            pending: None,
            in_flight: None,
            command_rx,
            completion_tx,
            completion_rx,
        };

        tokio::spawn(controller.run());
        ClassifierHandle { tx }
    }

    async fn run(mut self) {
        tracing::debug!("Classifier controller started");
        loop {
            tokio::select! {
                Some(completion) = self.completion_rx.recv() => self.complete(completion),
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        tracing::debug!("Classifier controller stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Classify {
                source,
                options,
                status_tx,
                reply,
            } => self.submit(source, options, status_tx, reply),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::History { reply } => {
                let _ = reply.send(self.state.history.to_vec());
            }
        }
    }

    fn submit(
        &mut self,
        source: ImageSource,
        options: ClassifyOptions,
        status_tx: Option<mpsc::UnboundedSender<ClassifyStatus>>,
        reply: Reply,
    ) {
        self.next_token += 1;
        let token = self.next_token;

        if let Some((stale, stale_reply)) = self.pending.take() {
            tracing::info!("Request #{} superseded by #{}", stale, token);
            let _ = stale_reply.send(Err(ClassifierError::Superseded));
        }
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }

        let pipeline = self.pipeline.clone();
        let completion_tx = self.completion_tx.clone();
        self.pending = Some((token, reply));
        self.in_flight = Some(tokio::spawn(async move {
            let result = pipeline.process_image(source, options, status_tx).await;
            let _ = completion_tx.send(Completion { token, result });
        }));
    }

    fn complete(&mut self, completion: Completion) {
        let current = matches!(self.pending, Some((token, _)) if token == completion.token);
        if !current {
            tracing::debug!("Discarding stale result of request #{}", completion.token);
            return;
        }

        self.in_flight = None;
        self.state.apply(&completion.result);

        if let Err(e) = &completion.result {
            tracing::warn!("Request #{} failed: {}", completion.token, e);
        }

        if let Some((_, reply)) = self.pending.take() {
            let _ = reply.send(completion.result);
        }
    }

    fn snapshot(&self) -> DisplaySnapshot {
        let linker = self.pipeline.search_linker();
        DisplaySnapshot {
            label: self.state.classification_label.clone(),
            identified_butterfly: self.state.identified_butterfly.clone(),
            more_info_url: self
                .state
                .identified_butterfly
                .as_deref()
                .map(|label| linker.more_info_url(label)),
            history: self.state.history.to_vec(),
        }
    }
}
