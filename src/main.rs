//! voxq - 队列驱动的 TTS worker
//!
//! - listen: 消费请求队列，同步参考音频、合成、回传结果
//! - seed: 从数据库生成任务并投递到请求队列
//! - send: 投递一条原始消息

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use voxq::application::pipeline::{build_seed_tasks, ResponseDispatcher, SeedTemplate, TaskProcessor};
use voxq::application::ports::{SynthesizerPort, VoiceSampleCriteria, VoiceSampleSourcePort};
use voxq::cli::{Cli, Command, USAGE};
use voxq::config::{load_config_from_path, print_config, AppConfig, SynthesisBackend};
use voxq::domain::task::Task;
use voxq::infrastructure::adapters::{
    CommandSynthesizer, CommandSynthesizerConfig, FileVoiceAssetStore, FixedSynthesizer,
    FixedSynthesizerConfig, HttpAssetFetcher, HttpCallbackClient, HttpSynthesizer,
    HttpSynthesizerConfig,
};
use voxq::infrastructure::broker::{AmqpResponsePublisher, BrokerError, BrokerSession};
use voxq::infrastructure::persistence::sqlite::{create_pool, DatabaseConfig, SqliteVoiceSampleSource};
use voxq::infrastructure::worker::{ActivityClock, LivenessWatchdog, ProcessExit, QueueWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse()?;
    if cli.command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("voxq - queue-driven TTS worker");
    print_config(&config);

    match cli.command {
        Command::Listen => listen(&config).await,
        Command::Seed => seed(&config).await,
        Command::Send(body) => send(&config, body).await,
        Command::Help => Ok(()),
    }
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},voxq={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_synthesizer(config: &AppConfig) -> anyhow::Result<Arc<dyn SynthesizerPort>> {
    let synthesis = &config.synthesis;
    let synthesizer: Arc<dyn SynthesizerPort> = match synthesis.backend {
        SynthesisBackend::Http => Arc::new(HttpSynthesizer::new(
            HttpSynthesizerConfig::new(&synthesis.url)
                .with_timeout(synthesis.timeout_secs)
                .with_output_dir(&synthesis.output_dir),
        )?),
        SynthesisBackend::Command => Arc::new(CommandSynthesizer::new(CommandSynthesizerConfig {
            program: synthesis
                .program
                .clone()
                .context("synthesis.program is not set")?,
            args: synthesis.args.clone(),
            output_dir: synthesis.output_dir.clone(),
            timeout_secs: synthesis.timeout_secs,
        })),
        SynthesisBackend::Fixed => Arc::new(FixedSynthesizer::new(FixedSynthesizerConfig {
            audio_file_path: synthesis
                .fixed_audio_path
                .clone()
                .context("synthesis.fixed_audio_path is not set")?,
            output_dir: synthesis.output_dir.clone(),
        })?),
    };
    tracing::info!(backend = synthesizer.name(), "Synthesis backend ready");
    Ok(synthesizer)
}

async fn listen(config: &AppConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.voices.root_dir).await?;
    tokio::fs::create_dir_all(&config.synthesis.output_dir).await?;

    let synthesizer = build_synthesizer(config)?;
    let fetcher = Arc::new(HttpAssetFetcher::new(config.voices.download_timeout_secs)?);
    let voice_store = Arc::new(FileVoiceAssetStore::new(&config.voices.root_dir, fetcher));
    let callback = Arc::new(HttpCallbackClient::new(config.delivery.callback_timeout_secs)?);

    let session = BrokerSession::open(&config.broker.url, &config.broker.request_queue).await?;
    let publisher = Arc::new(AmqpResponsePublisher::new(session.channel()));

    let dispatcher = ResponseDispatcher::new(publisher, callback, config.delivery.log_body_limit);
    let processor = Arc::new(TaskProcessor::new(voice_store, synthesizer, dispatcher));

    let clock = Arc::new(ActivityClock::new());
    let watchdog = config.watchdog.enabled.then(|| {
        LivenessWatchdog::new(
            clock.clone(),
            Duration::from_secs(config.watchdog.idle_timeout_secs),
            Duration::from_secs(config.watchdog.poll_interval_secs),
            Arc::new(ProcessExit::new(Some(session.closer()))),
        )
        .spawn()
    });

    let worker = QueueWorker::new(processor, clock);
    let result = match session.consume(&config.broker.consumer_tag).await {
        Ok(messages) => {
            tokio::select! {
                result = worker.run(messages) => result,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal");
                    Ok(())
                }
            }
        }
        Err(e) => Err(e),
    };

    if let Some(handle) = watchdog {
        handle.abort();
    }
    session.close().await;

    match result {
        Ok(()) => {
            tracing::info!(
                received = worker.stats().received(),
                delivered = worker.stats().delivered(),
                "Worker shutdown complete"
            );
            Ok(())
        }
        Err(BrokerError::StreamClosed) => {
            anyhow::bail!("consumer was cancelled by the broker")
        }
        Err(e) => Err(e.into()),
    }
}

async fn seed(config: &AppConfig) -> anyhow::Result<()> {
    let db_config = DatabaseConfig::new(&config.database.path)
        .with_max_connections(config.database.max_connections);
    let pool = create_pool(&db_config).await?;
    let source = SqliteVoiceSampleSource::new(pool);

    let criteria = VoiceSampleCriteria {
        security_level: config.seed.security_level.clone(),
        mime_type: config.seed.mime_type.clone(),
        files_per_user: config.seed.files_per_user,
    };
    let records = source.recent_voice_samples(&criteria).await?;

    let template = SeedTemplate {
        text: config.seed.text.clone(),
        output_file_name: config.seed.output_file_name.clone(),
        file_url_template: config.seed.file_url_template.clone(),
        callback_url: config.seed.callback_url.clone(),
        response_queue: config.seed.response_queue.clone(),
    };
    let tasks = build_seed_tasks(records, &template);
    if tasks.is_empty() {
        tracing::info!("No voice samples found, nothing to seed");
        return Ok(());
    }

    let session = BrokerSession::open(&config.broker.url, &config.broker.request_queue).await?;
    let mut result = Ok(());
    for task in &tasks {
        let body = serde_json::to_vec(task)?;
        if let Err(e) = session.send(&body).await {
            result = Err(e);
            break;
        }
        tracing::info!(user_id = task.user_id, files = task.files.len(), "Seeded task");
    }
    session.close().await;
    result?;

    tracing::info!(count = tasks.len(), queue = %config.broker.request_queue, "Seeding complete");
    Ok(())
}

async fn send(config: &AppConfig, body: String) -> anyhow::Result<()> {
    if let Err(e) = Task::decode(body.as_bytes()) {
        tracing::warn!(error = %e, "Message will not decode on the worker side, sending anyway");
    }

    let session = BrokerSession::open(&config.broker.url, &config.broker.request_queue).await?;
    let result = session.send(body.as_bytes()).await;
    session.close().await;
    result?;

    tracing::info!(queue = %config.broker.request_queue, "Message sent");
    Ok(())
}
