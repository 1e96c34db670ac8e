use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command as CliCommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taskrelay_core::{
    models::{Command, CommandType, DispatchRequest, Host, TargetCategory},
    AppConfig,
};
use taskrelay_dispatcher::ExecutorManager;
use taskrelay_infrastructure::{logging_processors, StaticNodeRegistry, TcpTransportSender};

fn cli() -> CliCommand {
    CliCommand::new("taskrelay")
        .version("1.0.0")
        .about("向Worker节点派发一条执行命令，失败时在候选节点间故障转移")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .arg(
            Arg::new("category")
                .long("category")
                .value_name("CATEGORY")
                .help("派发目标类型: node_pool 或 pinned_host")
                .default_value("node_pool"),
        )
        .arg(
            Arg::new("group")
                .short('g')
                .long("group")
                .value_name("GROUP")
                .help("Worker分组，默认为 default"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("ADDRESS:PORT")
                .help("优先尝试的节点，pinned_host 和 --direct 时为唯一目标"),
        )
        .arg(
            Arg::new("direct")
                .long("direct")
                .help("直接发往 --host，不查询注册中心也不做故障转移")
                .action(ArgAction::SetTrue)
                .requires("host"),
        )
        .arg(
            Arg::new("command-type")
                .short('t')
                .long("command-type")
                .value_name("TYPE")
                .help("命令类型")
                .default_value("TASK_EXECUTE_REQUEST"),
        )
        .arg(
            Arg::new("body")
                .short('b')
                .long("body")
                .value_name("JSON")
                .help("命令内容")
                .default_value("{}"),
        )
        .arg(
            Arg::new("wait-ms")
                .long("wait-ms")
                .value_name("MILLIS")
                .help("派发成功后等待Worker回传消息的时间")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config = AppConfig::load(matches.get_one::<String>("config").map(String::as_str))
        .context("加载配置失败")?;

    let log_level = matches
        .get_one::<String>("log-level")
        .unwrap_or(&config.observability.log_level);
    let log_format = matches
        .get_one::<String>("log-format")
        .unwrap_or(&config.observability.log_format);
    init_logging(log_level, log_format)?;

    info!(
        "派发配置: 单节点重试 {} 次，间隔 {}ms",
        config.dispatch.max_retries, config.dispatch.retry_delay_ms
    );

    let registry = Arc::new(StaticNodeRegistry::from_config(&config.registry)?);
    let transport = Arc::new(TcpTransportSender::new(config.transport.clone()));
    let manager = ExecutorManager::new(&config.dispatch, registry, transport);
    manager.init(logging_processors())?;

    let command = build_command(&matches)?;
    let host = matches
        .get_one::<String>("host")
        .map(|address| address.parse::<Host>())
        .transpose()?;

    let report = if matches.get_flag("direct") {
        let host = host.context("--direct 需要 --host")?;
        match manager.execute_directly(&host, &command).await {
            Ok(attempt) => serde_json::to_string_pretty(&attempt)?,
            Err(failure) => {
                error!("直接派发失败: {}", failure);
                return Err(failure.into());
            }
        }
    } else {
        let request = build_request(&matches, command, host)?;
        match manager.execute(&request).await {
            Ok(outcome) => serde_json::to_string_pretty(&outcome)?,
            Err(e) => {
                error!("派发失败: {}", e);
                return Err(e.into());
            }
        }
    };
    println!("{report}");

    let wait_ms = matches.get_one::<u64>("wait-ms").copied().unwrap_or(0);
    if wait_ms > 0 {
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
    }

    Ok(())
}

fn build_command(matches: &ArgMatches) -> Result<Command> {
    let command_type = matches
        .get_one::<String>("command-type")
        .map(|s| s.parse::<CommandType>())
        .transpose()?
        .unwrap_or(CommandType::TaskExecuteRequest);
    let body = match matches.get_one::<String>("body") {
        Some(raw) => serde_json::from_str(raw).context("命令内容不是合法的JSON")?,
        None => serde_json::Value::Object(Default::default()),
    };
    Ok(Command::new(command_type, body))
}

fn build_request(
    matches: &ArgMatches,
    command: Command,
    host: Option<Host>,
) -> Result<DispatchRequest> {
    let category = matches
        .get_one::<String>("category")
        .map(|s| s.parse::<TargetCategory>())
        .transpose()?
        .unwrap_or(TargetCategory::NodePool);
    let group = matches.get_one::<String>("group").cloned();

    Ok(DispatchRequest::new(category, group, command, host)?)
}

/// 初始化日志系统，输出到stderr，stdout只留给派发结果
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}
