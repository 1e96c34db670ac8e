use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use taskrelay_core::{
    errors::TransportError,
    models::{Command, CommandType, Host},
    traits::{ResponseProcessor, TransportSender},
    TransportConfig,
};

type ProcessorMap = HashMap<CommandType, Arc<dyn ResponseProcessor>>;

/// 基于TCP的传输层，每帧是一行JSON编码的 [`Command`]
///
/// 每次发送建立一条连接，写入成功即视为投递成功。Worker在同一连接上
/// 回传的消息交给按命令类型注册的处理器，直到对端关闭连接或超过
/// `response_idle_timeout_ms` 没有新消息。
///
/// 回传读取任务归发送器所有，发送器被丢弃时全部中止，连接随之关闭。
pub struct TcpTransportSender {
    config: TransportConfig,
    processors: Arc<RwLock<ProcessorMap>>,
    readers: Mutex<JoinSet<()>>,
}

impl TcpTransportSender {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            processors: Arc::new(RwLock::new(HashMap::new())),
            readers: Mutex::new(JoinSet::new()),
        }
    }

    /// 仍在等待回传消息的连接数
    pub fn open_connections(&self) -> usize {
        let mut readers = self.readers.lock().unwrap_or_else(PoisonError::into_inner);
        while readers.try_join_next().is_some() {}
        readers.len()
    }

    async fn connect(&self, host: &Host) -> Result<TcpStream, TransportError> {
        let address = host.to_string();
        match timeout(self.config.connect_timeout(), TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(TransportError::Connection(format!("{address}: {e}"))),
            Err(_) => Err(TransportError::Timeout(format!(
                "连接 {} 超过 {}ms",
                address, self.config.connect_timeout_ms
            ))),
        }
    }

    fn spawn_response_reader(&self, host: Host, reader: OwnedReadHalf, writer: OwnedWriteHalf) {
        let processors = self.processors.clone();
        let idle = self.config.response_idle_timeout();

        let mut readers = self.readers.lock().unwrap_or_else(PoisonError::into_inner);
        // 回收已结束的读取任务
        while readers.try_join_next().is_some() {}
        readers.spawn(read_responses(host, reader, writer, processors, idle));
    }
}

/// 读取一条连接上的回传消息，返回时两个半连接一起释放
async fn read_responses(
    host: Host,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    processors: Arc<RwLock<ProcessorMap>>,
    idle: Duration,
) {
    let _writer = writer;
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match timeout(idle, lines.next_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                debug!("读取节点 {} 的回传消息失败: {}", host, e);
                break;
            }
            Err(_) => {
                debug!("节点 {} 超过 {}ms 没有回传消息，关闭连接", host, idle.as_millis());
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match decode_frame(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("节点 {} 回传了无法解析的消息: {}", host, e);
                continue;
            }
        };

        let processor = processors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&command.command_type)
            .cloned();
        match processor {
            Some(processor) => processor.process(&host, command).await,
            None => warn!(
                "没有注册 {} 的处理器，丢弃来自 {} 的消息 {}",
                command.command_type, host, command.id
            ),
        }
    }
}

impl Drop for TcpTransportSender {
    fn drop(&mut self) {
        self.readers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}

impl Default for TcpTransportSender {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl TransportSender for TcpTransportSender {
    async fn send(&self, host: &Host, command: &Command) -> Result<(), TransportError> {
        let frame = encode_frame(command)?;
        let stream = self.connect(host).await?;
        let (reader, mut writer) = stream.into_split();

        let write = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        };
        match timeout(self.config.write_timeout(), write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(TransportError::from(e)),
            Err(_) => {
                return Err(TransportError::Timeout(format!(
                    "写入 {} 超过 {}ms",
                    host, self.config.write_timeout_ms
                )))
            }
        }

        debug!("命令 {} 已写入节点 {}", command.id, host);
        self.spawn_response_reader(host.clone(), reader, writer);
        Ok(())
    }

    fn register_processor(&self, command_type: CommandType, processor: Arc<dyn ResponseProcessor>) {
        self.processors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command_type, processor);
    }
}

/// 编码为以换行结尾的JSON帧
pub fn encode_frame(command: &Command) -> Result<Vec<u8>, TransportError> {
    let mut frame = serde_json::to_vec(command)?;
    frame.push(b'\n');
    Ok(frame)
}

pub fn decode_frame(line: &str) -> Result<Command, TransportError> {
    Ok(serde_json::from_str(line.trim_end())?)
}
