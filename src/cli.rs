//! 命令行参数
//!
//! ```text
//! voxq [--config PATH] [listen | seed | send <json>]
//! ```
//!
//! `-l/--listen` 与 `-p/--process` 为旧入口的别名，
//! 单独一个非命令参数视为要发送的消息。

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

const CONFIG_ARG: &str = "--config";
const CONFIG_ARG_SHORT: &str = "-c";

pub const USAGE: &str = "usage: voxq [--config PATH] [listen | seed | send <json>]";

/// 运行模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 消费请求队列（默认）
    Listen,
    /// 从数据库生成任务并投递到请求队列
    Seed,
    /// 把一条原始消息投递到请求队列
    Send(String),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

impl Cli {
    pub fn parse() -> Result<Self> {
        Self::parse_from(std::env::args().skip(1))
    }

    pub fn parse_from<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config_path = None;
        let mut command = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            if arg == CONFIG_ARG || arg == CONFIG_ARG_SHORT {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("{arg} requires a path"))?;
                config_path = Some(PathBuf::from(value));
                continue;
            }

            let prefix = format!("{CONFIG_ARG}=");
            if let Some(value) = arg.strip_prefix(&prefix) {
                config_path = Some(PathBuf::from(value));
                continue;
            }

            let next = match arg.as_str() {
                "listen" | "-l" | "--listen" => Command::Listen,
                "seed" | "-p" | "--process" => Command::Seed,
                "send" => {
                    let body = args
                        .next()
                        .ok_or_else(|| anyhow!("send requires a JSON message"))?;
                    Command::Send(body)
                }
                "-h" | "--help" | "help" => Command::Help,
                other if other.starts_with('-') => bail!("unknown option `{other}`\n{USAGE}"),
                _ => Command::Send(arg),
            };

            if command.replace(next).is_some() {
                bail!("only one command may be given\n{USAGE}");
            }
        }

        Ok(Self {
            config_path,
            command: command.unwrap_or(Command::Listen),
        })
    }
}
